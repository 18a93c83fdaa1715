//src/record.rs

use serde_json::Value;

/// A leaf value inside a [`TaxonRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    /// Integers from the source, signed or not.
    Integer(i128),
    Float(f64),
    Text(String),
}

/// One nested record as returned by the lookup service.
///
/// Mappings keep their entries in the order the service produced them;
/// the extractor depends on that order, so nothing here ever sorts.
#[derive(Debug, Clone, PartialEq)]
pub enum TaxonRecord {
    Scalar(Scalar),
    Mapping(Vec<(String, TaxonRecord)>),
    Sequence(Vec<TaxonRecord>),
}

impl TaxonRecord {
    pub fn text(s: impl Into<String>) -> Self {
        TaxonRecord::Scalar(Scalar::Text(s.into()))
    }

    pub fn integer(n: i128) -> Self {
        TaxonRecord::Scalar(Scalar::Integer(n))
    }

    pub fn null() -> Self {
        TaxonRecord::Scalar(Scalar::Null)
    }

    /// Build a mapping from `(key, value)` pairs, keeping their order.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, TaxonRecord)>,
    {
        TaxonRecord::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn sequence<I: IntoIterator<Item = TaxonRecord>>(items: I) -> Self {
        TaxonRecord::Sequence(items.into_iter().collect())
    }

    /// Mapping or sequence.
    pub fn is_container(&self) -> bool {
        !matches!(self, TaxonRecord::Scalar(_))
    }
}

impl From<Value> for TaxonRecord {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => TaxonRecord::Scalar(Scalar::Null),
            Value::Bool(b) => TaxonRecord::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                let scalar = if let Some(u) = n.as_u64() {
                    Scalar::Integer(u as i128)
                } else if let Some(i) = n.as_i64() {
                    Scalar::Integer(i as i128)
                } else {
                    Scalar::Float(n.as_f64().unwrap_or(f64::NAN))
                };
                TaxonRecord::Scalar(scalar)
            }
            Value::String(s) => TaxonRecord::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                TaxonRecord::Sequence(items.into_iter().map(TaxonRecord::from).collect())
            }
            // serde_json is built with `preserve_order`, so this walks
            // entries in document order.
            Value::Object(map) => TaxonRecord::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, TaxonRecord::from(v)))
                    .collect(),
            ),
        }
    }
}
