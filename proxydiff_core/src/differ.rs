use proxydiff_common::{ComparisonResult, FileEntry, FrameMismatch, GroupMap, ScanMode};
use tracing::debug;

/// Compute the symmetric key difference between two group maps and, under
/// [`ScanMode::ProxyAdvanced`], the frame-count mismatches among common keys.
///
/// A key where either side has no frame count is skipped: absence means the
/// file was unreadable or not a recognized video, not that the files differ.
/// The caller fills in the group paths and conflict records afterwards.
pub fn diff(group1: &GroupMap, group2: &GroupMap, mode: ScanMode) -> ComparisonResult {
    let mut unique_to_group1: Vec<FileEntry> = group1
        .iter()
        .filter(|(key, _)| !group2.contains_key(*key))
        .map(|(_, entry)| entry.clone())
        .collect();
    unique_to_group1.sort_by(|a, b| a.key.cmp(&b.key));

    let mut unique_to_group2: Vec<FileEntry> = group2
        .iter()
        .filter(|(key, _)| !group1.contains_key(*key))
        .map(|(_, entry)| entry.clone())
        .collect();
    unique_to_group2.sort_by(|a, b| a.key.cmp(&b.key));

    let mut mismatches = Vec::new();
    if mode == ScanMode::ProxyAdvanced {
        for (key, entry1) in group1 {
            let Some(entry2) = group2.get(key) else {
                continue;
            };
            let (Some(frames1), Some(frames2)) = (entry1.frame_count, entry2.frame_count)
            else {
                continue;
            };
            if frames1 == frames2 {
                continue;
            }
            mismatches.push(FrameMismatch {
                key: key.clone(),
                path1: entry1.path.clone(),
                path2: entry2.path.clone(),
                filename1: entry1.filename.clone(),
                filename2: entry2.filename.clone(),
                frames1,
                frames2,
                difference: frames1.abs_diff(frames2),
            });
        }
        // Largest discrepancies first; key breaks ties so output is stable.
        mismatches.sort_by(|a, b| {
            b.difference
                .cmp(&a.difference)
                .then_with(|| a.key.cmp(&b.key))
        });
    }

    debug!(
        "Diff: {} unique to group 1, {} unique to group 2, {} frame mismatches",
        unique_to_group1.len(),
        unique_to_group2.len(),
        mismatches.len()
    );

    ComparisonResult {
        mode,
        group1_paths: Vec::new(),
        group2_paths: Vec::new(),
        unique_to_group1,
        unique_to_group2,
        mismatches,
        group1_conflicts: Vec::new(),
        group2_conflicts: Vec::new(),
    }
}
