use crate::filter::PathFilter;
use crate::probe::MetadataProbe;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;
use proxydiff_common::{FileEntry, GroupMap, ProxydiffConfig, ProxydiffError, Result, ScanMode};
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Recursive scanner for one directory tree.
///
/// Walks the tree with skipped subtrees pruned before descent, applies the
/// mode's filtering, and keys each retained file for comparison. Walk order
/// is OS-dependent: when two files derive the same key within one scan the
/// first one encountered wins, and which that is may differ across
/// platforms.
pub struct DirectoryScanner {
    mode: ScanMode,
    filter: PathFilter,
    video_extensions: HashSet<String>,
    custom_ignore: Option<Gitignore>,
    probe: Option<Arc<dyn MetadataProbe>>,
}

impl DirectoryScanner {
    pub fn new(config: &ProxydiffConfig, mode: ScanMode) -> Self {
        Self {
            mode,
            filter: PathFilter::new(config),
            video_extensions: config
                .video_extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            custom_ignore: Self::build_custom_ignore(config),
            probe: None,
        }
    }

    /// Attach the metadata probe used under [`ScanMode::ProxyAdvanced`].
    /// An advanced scan without a probe still succeeds but records no frame
    /// counts, so the differ will have nothing to compare.
    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Build a Gitignore from extra ignore patterns in config
    fn build_custom_ignore(config: &ProxydiffConfig) -> Option<Gitignore> {
        if config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in &config.ignore_patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                debug!("Failed to add ignore pattern '{}': {}", pattern, err);
            }
        }

        match builder.build() {
            Ok(ignore) => Some(ignore),
            Err(e) => {
                debug!("Failed to build custom ignore: {}", e);
                None
            }
        }
    }

    /// Scan a directory tree into a keyed map of retained files.
    pub fn scan(&self, root: &Path) -> Result<GroupMap> {
        self.scan_with_cancel(root, None)
    }

    /// Scan a directory tree, checking a cancellation flag between entries.
    /// A cancelled scan returns an error; its partial map is discarded.
    pub fn scan_with_cancel(
        &self,
        root: &Path,
        cancel: Option<&AtomicBool>,
    ) -> Result<GroupMap> {
        if !root.is_dir() {
            return Err(ProxydiffError::PathNotFound(root.display().to_string()));
        }

        if self.mode == ScanMode::ProxyAdvanced && self.probe.is_none() {
            warn!(
                "Advanced scan of {} has no metadata probe; frame counts will be absent",
                root.display()
            );
        }

        let mut map = GroupMap::new();

        // Prune skipped directories before descending so nothing under them
        // is ever opened or stat'ed.
        let prune_filter = self.filter.clone();
        let walker = WalkDir::new(root)
            .skip_hidden(false)
            // Serial walk: per-directory concurrency comes from the caller's
            // pool, and jwalk's default rayon parallelism starves when that
            // pool's threads are all blocked in scan closures.
            .parallelism(jwalk::Parallelism::Serial)
            .process_read_dir(move |_depth, _path, _state, children| {
                children.retain(|child| match child {
                    Ok(entry) => {
                        !entry.file_type.is_dir()
                            || !prune_filter
                                .is_skipped_dir_name(&entry.file_name.to_string_lossy())
                    }
                    // Keep errors so the walk loop below can log them.
                    Err(_) => true,
                });
            });

        for entry in walker {
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                return Err(ProxydiffError::Scan("scan cancelled".to_string()));
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // One unreadable subtree must not abort the whole scan.
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };

            if entry.file_type.is_dir() {
                continue;
            }

            let path = entry.path();

            // Defensive re-check of the full path; pruning should already
            // have removed anything under a skipped directory.
            if self.filter.path_contains_skipped_dir(&path) {
                continue;
            }

            let filename = entry.file_name.to_string_lossy().to_string();
            if self.filter.is_skipped_file_name(&filename) {
                continue;
            }

            if let Some(ref ignore) = self.custom_ignore {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                if self.ignore_matches_with_parents(ignore, relative) {
                    continue;
                }
            }

            let Some(key) = self.derive_key(&filename) else {
                continue;
            };

            // First occurrence wins; later files with the same key are
            // dropped without probing them.
            if map.contains_key(&key) {
                continue;
            }

            let frame_count = match (self.mode, &self.probe) {
                (ScanMode::ProxyAdvanced, Some(probe)) => {
                    let count = probe.frame_count(&path);
                    if count.is_none() {
                        warn!(
                            "Could not read frame count for {}; continuing without it",
                            path.display()
                        );
                    }
                    count
                }
                _ => None,
            };

            map.insert(
                key.clone(),
                FileEntry {
                    key,
                    path,
                    filename,
                    frame_count,
                },
            );
        }

        debug!("Scanned {} keyed files from {}", map.len(), root.display());
        Ok(map)
    }

    /// Key derivation per mode. Returns `None` for files the mode filters
    /// out (non-video files in the proxy modes).
    fn derive_key(&self, filename: &str) -> Option<String> {
        match self.mode {
            ScanMode::Normal => Some(filename.to_string()),
            ScanMode::Proxy | ScanMode::ProxyAdvanced => {
                let name = Path::new(filename);
                let extension = name
                    .extension()
                    .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))?;
                if !self.video_extensions.contains(&extension) {
                    return None;
                }
                Some(name.file_stem()?.to_string_lossy().to_string())
            }
        }
    }

    /// Check the relative path and every parent directory against the
    /// custom ignore patterns.
    fn ignore_matches_with_parents(&self, ignore: &Gitignore, path: &Path) -> bool {
        if ignore.matched(path, false).is_ignore() {
            return true;
        }

        let mut current = path;
        while let Some(parent) = current.parent() {
            if !parent.as_os_str().is_empty() && ignore.matched(parent, true).is_ignore() {
                return true;
            }
            current = parent;
        }
        false
    }
}
