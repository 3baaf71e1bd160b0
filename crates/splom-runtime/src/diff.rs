#![forbid(unsafe_code)]

//! The diff engine: baseline set vs. desired set of canonical strings.

use std::collections::HashSet;

/// The work a reconciliation run has to do on every cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diff {
    /// Canonical strings to attach, in desired order, without duplicates.
    pub to_add: Vec<String>,
    /// Canonical strings to detach, in baseline order, without duplicates.
    pub to_remove: Vec<String>,
    /// The baseline was empty, so every desired overlay is (re)added to
    /// every cell.
    pub full_rebuild: bool,
}

impl Diff {
    /// Nothing to add or remove.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute what changes between `baseline` and `desired`.
///
/// `to_add = desired − baseline` and `to_remove = baseline − desired`,
/// except when `baseline` is empty: then `to_remove` is empty and all of
/// `desired` is added, even to cells that already hold a matching overlay.
pub fn diff<B, D>(baseline: &[B], desired: &[D]) -> Diff
where
    B: AsRef<str>,
    D: AsRef<str>,
{
    let desired = unique(desired);
    if baseline.is_empty() {
        return Diff {
            to_add: desired,
            to_remove: Vec::new(),
            full_rebuild: true,
        };
    }
    let baseline = unique(baseline);
    let in_baseline: HashSet<&str> = baseline.iter().map(String::as_str).collect();
    let in_desired: HashSet<&str> = desired.iter().map(String::as_str).collect();

    let to_add = desired
        .iter()
        .filter(|s| !in_baseline.contains(s.as_str()))
        .cloned()
        .collect();
    let to_remove = baseline
        .iter()
        .filter(|s| !in_desired.contains(s.as_str()))
        .cloned()
        .collect();
    Diff {
        to_add,
        to_remove,
        full_rebuild: false,
    }
}

/// First occurrence of each string, order kept.
pub(crate) fn unique<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .map(AsRef::as_ref)
        .filter(|s| seen.insert(*s))
        .map(str::to_string)
        .collect()
}
