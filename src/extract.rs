//src/extract.rs

use crate::record::{Scalar, TaxonRecord};

/// Find the first taxonomic identifier embedded in `record`.
///
/// Only a mapping counts as a record; any other top-level value yields `None`.
/// The walk is depth-first in the record's own order. At each mapping entry
/// whose key contains "tax" (any case) a non-negative integer value wins
/// immediately; otherwise nested containers are searched before moving on
/// to the next sibling.
pub fn extract_tax_id(record: &TaxonRecord) -> Option<u64> {
    match record {
        TaxonRecord::Mapping(_) => find_tax_id(record),
        _ => None,
    }
}

fn find_tax_id(node: &TaxonRecord) -> Option<u64> {
    match node {
        TaxonRecord::Mapping(entries) => {
            for (key, value) in entries {
                if key.to_lowercase().contains("tax") {
                    if let TaxonRecord::Scalar(scalar) = value {
                        if let Some(id) = scalar_tax_id(scalar) {
                            return Some(id);
                        }
                    }
                }
                if value.is_container() {
                    if let Some(id) = find_tax_id(value) {
                        return Some(id);
                    }
                }
            }
            None
        }
        TaxonRecord::Sequence(items) => items.iter().find_map(find_tax_id),
        TaxonRecord::Scalar(_) => None,
    }
}

/// Integers and digit strings qualify; everything else is skipped.
fn scalar_tax_id(scalar: &Scalar) -> Option<u64> {
    match scalar {
        Scalar::Integer(n) => u64::try_from(*n).ok(),
        Scalar::Text(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                trimmed.parse().ok()
            } else {
                None
            }
        }
        Scalar::Null | Scalar::Bool(_) | Scalar::Float(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json(text: &str) -> TaxonRecord {
        TaxonRecord::from(serde_json::from_str::<serde_json::Value>(text).unwrap())
    }

    #[test]
    fn test_single_tax_key_any_case() {
        for key in ["tax_id", "NCBI_TaxID", "TAXONOMY", "ncbi tax id"] {
            let record = TaxonRecord::mapping([
                ("name", TaxonRecord::text("E. coli")),
                (key, TaxonRecord::integer(562)),
            ]);
            assert_eq!(extract_tax_id(&record), Some(562), "key {}", key);
        }
    }

    #[test]
    fn test_digit_string_is_trimmed() {
        let record = json(r#"{"General": {"NCBI tax id": {"NCBI tax id": " 1423 "}}}"#);
        assert_eq!(extract_tax_id(&record), Some(1423));
    }

    #[test]
    fn test_non_records_are_absent() {
        assert_eq!(extract_tax_id(&TaxonRecord::text("tax_id 12")), None);
        assert_eq!(extract_tax_id(&TaxonRecord::null()), None);
        assert_eq!(extract_tax_id(&TaxonRecord::integer(5)), None);
        let list = TaxonRecord::sequence([TaxonRecord::mapping([("taxid", TaxonRecord::integer(3))])]);
        assert_eq!(extract_tax_id(&list), None);
    }

    #[test]
    fn test_malformed_tax_values_are_skipped() {
        let record = json(
            r#"{"taxonomy": "unknown", "tax_score": -4, "taxon_ok": true, "tax_f": 2.0,
                "details": {"taxid": "12a"}, "later": {"tax": "77"}}"#,
        );
        assert_eq!(extract_tax_id(&record), Some(77));
    }

    #[test]
    fn test_nested_descent_precedes_later_siblings() {
        // "a" holds a nested match that must win over the top-level "tax_id" after it.
        let record = json(r#"{"a": {"b": [{"x": 1}, {"TaxID": 10}]}, "tax_id": 20}"#);
        assert_eq!(extract_tax_id(&record), Some(10));
    }

    #[test]
    fn test_first_match_in_key_order_wins() {
        let record = json(r#"{"tax_b": 2, "tax_a": 1}"#);
        assert_eq!(extract_tax_id(&record), Some(2));
    }

    #[test]
    fn test_tax_keyed_container_is_searched() {
        let record = json(r#"{"taxonomy": [{"rank": "genus"}, {"taxid": 561}]}"#);
        assert_eq!(extract_tax_id(&record), Some(561));
    }

    #[test]
    fn test_deep_nesting_without_match() {
        let mut record = TaxonRecord::mapping([("leaf", TaxonRecord::text("none"))]);
        for depth in 0..200 {
            record = if depth % 2 == 0 {
                TaxonRecord::mapping([("level", record)])
            } else {
                TaxonRecord::sequence([TaxonRecord::null(), record])
            };
        }
        let record = TaxonRecord::mapping([("root", record)]);
        assert_eq!(extract_tax_id(&record), None);
    }
}
