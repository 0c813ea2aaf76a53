use proxydiff_common::{Conflict, GroupMap};
use std::collections::hash_map::Entry;
use tracing::debug;

/// Merge per-directory maps into one group map.
///
/// Maps are processed in the given order: the first map containing a key
/// determines the stored entry, and every later occurrence of the same key
/// is recorded as a [`Conflict`] without altering the merged map. The input
/// order is the conflict tie-break rule, so callers must pass maps in the
/// order the directories were listed.
pub fn merge_group_maps(maps: Vec<GroupMap>) -> (GroupMap, Vec<Conflict>) {
    let mut merged = GroupMap::new();
    let mut conflicts = Vec::new();

    for map in maps {
        for (key, entry) in map {
            match merged.entry(key) {
                Entry::Occupied(existing) => {
                    conflicts.push(Conflict {
                        key: existing.key().clone(),
                        existing_path: existing.get().path.clone(),
                        new_path: entry.path,
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
            }
        }
    }

    // Iteration order within one map is arbitrary; sort so diagnostics are
    // stable across runs.
    conflicts.sort_by(|a, b| a.key.cmp(&b.key));

    debug!(
        "Merged into {} entries with {} conflicts",
        merged.len(),
        conflicts.len()
    );
    (merged, conflicts)
}
