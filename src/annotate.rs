//src/annotate.rs

use crate::trait_sets::TraitSets;
use crate::types::{AlignmentHit, AnnotatedHit};

/// Traits that take part in the collapsed annotation label.
pub const PAIRED_TRAITS: [&str; 5] = [
    "acidophilic",
    "alkaliphilic",
    "halophilic",
    "psychrophilic",
    "thermophilic",
];

/// Pairs that cancel out when both are present, applied in this order.
const ANTAGONISTS: [(&str, &str); 2] = [
    ("thermophilic", "psychrophilic"),
    ("alkaliphilic", "acidophilic"),
];

/// One flag per trait in `sets.names()` order.
pub fn tag_traits(hit: &AlignmentHit, sets: &TraitSets) -> Vec<bool> {
    sets.names()
        .iter()
        .map(|name| match hit.taxonomic_id {
            Some(tax_id) => sets.contains(name, tax_id),
            None => false,
        })
        .collect()
}

/// Collapse the present paired traits into a single label.
///
/// Antagonistic pairs drop out together; what is left is empty, a single
/// name, or the names sorted and joined with " & ".
pub fn annotation_label<'a, I>(present: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut present: Vec<&str> = present
        .into_iter()
        .filter(|name| PAIRED_TRAITS.contains(name))
        .collect();

    for (a, b) in ANTAGONISTS {
        if present.contains(&a) && present.contains(&b) {
            present.retain(|name| *name != a && *name != b);
        }
    }

    present.sort_unstable();
    present.dedup();
    present.join(" & ")
}

pub fn annotate_hit(hit: &AlignmentHit, sets: &TraitSets) -> AnnotatedHit {
    let traits = tag_traits(hit, sets);
    let annotation = annotation_label(
        sets.names()
            .iter()
            .zip(&traits)
            .filter(|(_, flag)| **flag)
            .map(|(name, _)| name.as_str()),
    );
    AnnotatedHit {
        hit: hit.clone(),
        traits,
        annotation,
    }
}

pub fn annotate_hits(hits: &[AlignmentHit], sets: &TraitSets) -> Vec<AnnotatedHit> {
    hits.iter().map(|hit| annotate_hit(hit, sets)).collect()
}
