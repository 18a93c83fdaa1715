//src/lookup.rs

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::LookupError;
use crate::record::TaxonRecord;

/// Default endpoint of the BacDive strain API.
pub const BACDIVE_BASE_URL: &str = "https://api.bacdive.dsmz.de";

/// Records produced by one `retrieve()`: lazy, finite, consumed once.
pub type Records<'a> = Box<dyn Iterator<Item = Result<TaxonRecord, LookupError>> + 'a>;

/// A stateful conversation with the lookup service.
///
/// `retrieve` yields the records selected by the most recent `search`.
pub trait LookupSession {
    fn search(&mut self, identifier: &str) -> Result<(), LookupError>;
    fn retrieve(&mut self) -> Result<Records<'_>, LookupError>;
}

/// Shared handle to the lookup service.
///
/// The client itself is shared by every worker; each worker opens its own
/// session so no search state is ever shared between threads.
pub trait LookupClient: Sync {
    fn session(&self) -> Box<dyn LookupSession + '_>;
}

// ---------------------------------------------------------------------------
//  BacDive over HTTP
// ---------------------------------------------------------------------------

/// Blocking HTTP client for `GET {base_url}/fetch/{id}`.
pub struct BacdiveClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl BacdiveClient {
    pub fn new(base_url: &str) -> Result<Self, LookupError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("homolog-traits/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl LookupClient for BacdiveClient {
    fn session(&self) -> Box<dyn LookupSession + '_> {
        Box::new(BacdiveSession {
            client: self,
            pending: None,
        })
    }
}

struct BacdiveSession<'a> {
    client: &'a BacdiveClient,
    pending: Option<Vec<Value>>,
}

impl LookupSession for BacdiveSession<'_> {
    fn search(&mut self, identifier: &str) -> Result<(), LookupError> {
        let url = format!("{}/fetch/{}", self.client.base_url, identifier);
        let response = self.client.http.get(&url).send()?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            self.pending = Some(Vec::new());
            return Ok(());
        }
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let body: Value = response.json()?;
        self.pending = Some(results_of(body)?);
        Ok(())
    }

    fn retrieve(&mut self) -> Result<Records<'_>, LookupError> {
        let results = self.pending.take().ok_or(LookupError::NoSearch)?;
        Ok(Box::new(
            results
                .into_iter()
                .map(|v| Ok::<_, LookupError>(TaxonRecord::from(v))),
        ))
    }
}

/// Pull the record list out of a response body.
///
/// `results` is either an object keyed by strain id or a plain array.
fn results_of(body: Value) -> Result<Vec<Value>, LookupError> {
    let mut body = match body {
        Value::Object(map) => map,
        _ => return Err(LookupError::Service("response is not a JSON object".into())),
    };
    if let Some(Value::String(message)) = body.get("message") {
        if body.get("results").is_none() {
            return Err(LookupError::Service(message.clone()));
        }
    }
    match body.remove("results") {
        Some(Value::Object(by_id)) => Ok(by_id.into_iter().map(|(_, v)| v).collect()),
        Some(Value::Array(items)) => Ok(items),
        Some(Value::Null) | None => Ok(Vec::new()),
        Some(other) => Ok(vec![other]),
    }
}

// ---------------------------------------------------------------------------
//  In-memory service
// ---------------------------------------------------------------------------

/// Lookup service backed by a fixed table; used offline and in tests.
#[derive(Default)]
pub struct MemoryLookup {
    records: AHashMap<String, Vec<TaxonRecord>>,
    failing: AHashSet<String>,
    searched: Mutex<Vec<String>>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, identifier: &str, record: TaxonRecord) -> Self {
        self.records
            .entry(identifier.to_string())
            .or_default()
            .push(record);
        self
    }

    /// Make every search for `identifier` fail.
    pub fn with_failure(mut self, identifier: &str) -> Self {
        self.failing.insert(identifier.to_string());
        self
    }

    /// Identifiers searched so far, in call order.
    pub fn searched(&self) -> Vec<String> {
        self.searched.lock().clone()
    }
}

impl LookupClient for MemoryLookup {
    fn session(&self) -> Box<dyn LookupSession + '_> {
        Box::new(MemorySession {
            lookup: self,
            pending: None,
        })
    }
}

struct MemorySession<'a> {
    lookup: &'a MemoryLookup,
    pending: Option<&'a [TaxonRecord]>,
}

impl LookupSession for MemorySession<'_> {
    fn search(&mut self, identifier: &str) -> Result<(), LookupError> {
        self.lookup.searched.lock().push(identifier.to_string());
        if self.lookup.failing.contains(identifier) {
            return Err(LookupError::Service(format!("lookup of {} refused", identifier)));
        }
        self.pending = Some(
            self.lookup
                .records
                .get(identifier)
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        );
        Ok(())
    }

    fn retrieve(&mut self) -> Result<Records<'_>, LookupError> {
        let records = self.pending.take().ok_or(LookupError::NoSearch)?;
        Ok(Box::new(records.iter().cloned().map(Ok::<_, LookupError>)))
    }
}
