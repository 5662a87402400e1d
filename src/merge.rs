//! Identity-based merge of a new batch into the persisted record.

use std::collections::HashSet;

use crate::model::{MasterData, TabGroup};

/// Counts reported after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: usize,
    pub duplicates: usize,
    pub total: usize,
}

/// Union of `existing` and the groups of `incoming` whose id is not already
/// present. Existing groups always win, even when the incoming copy differs.
///
/// Provenance and `exported_at` come from `incoming`; groups are re-sorted
/// and stats recomputed from scratch, so merging the same batch twice is a
/// no-op the second time.
pub fn merge(existing: &MasterData, incoming: &MasterData) -> MasterData {
    merge_with_summary(existing, incoming).0
}

pub fn merge_with_summary(
    existing: &MasterData,
    incoming: &MasterData,
) -> (MasterData, MergeSummary) {
    let mut seen: HashSet<&str> = existing.groups.iter().map(|g| g.id.as_str()).collect();
    let mut groups: Vec<TabGroup> = existing.groups.clone();
    let mut duplicates = 0usize;

    for group in &incoming.groups {
        // `insert` also guards against a batch that repeats an id.
        if seen.insert(group.id.as_str()) {
            groups.push(group.clone());
        } else {
            duplicates += 1;
        }
    }

    let added = groups.len() - existing.groups.len();
    let merged = MasterData::from_groups(
        incoming.source.clone(),
        groups,
        incoming.exported_at.clone(),
    );
    let summary = MergeSummary {
        added,
        duplicates,
        total: merged.groups.len(),
    };
    (merged, summary)
}
