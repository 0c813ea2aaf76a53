use crate::differ::diff;
use crate::group::merge_group_maps;
use crate::probe::MetadataProbe;
use crate::scanner::DirectoryScanner;
use proxydiff_common::{
    ComparisonResult, Conflict, GroupMap, ProxydiffConfig, ProxydiffError, Result, ScanMode,
};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

/// Orchestrates one comparison run: validates the input directories, checks
/// probe availability, scans each group on a bounded worker pool, merges the
/// per-directory maps in input order, and diffs the two groups.
pub struct CompareEngine {
    config: ProxydiffConfig,
    mode: ScanMode,
    probe: Option<Arc<dyn MetadataProbe>>,
}

impl CompareEngine {
    pub fn new(config: ProxydiffConfig, mode: ScanMode) -> Self {
        Self {
            config,
            mode,
            probe: None,
        }
    }

    /// Attach the metadata probe required by [`ScanMode::ProxyAdvanced`].
    pub fn with_probe(mut self, probe: Arc<dyn MetadataProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn run(
        &self,
        group1_dirs: &[PathBuf],
        group2_dirs: &[PathBuf],
    ) -> Result<ComparisonResult> {
        self.run_with_cancel(group1_dirs, group2_dirs, None)
    }

    pub fn run_with_cancel(
        &self,
        group1_dirs: &[PathBuf],
        group2_dirs: &[PathBuf],
        cancel: Option<&AtomicBool>,
    ) -> Result<ComparisonResult> {
        // Every input directory must exist before any scanning begins.
        for dir in group1_dirs.iter().chain(group2_dirs.iter()) {
            if !dir.is_dir() {
                return Err(ProxydiffError::PathNotFound(dir.display().to_string()));
            }
        }

        // Fail fast before scanning rather than mid-run.
        if self.mode == ScanMode::ProxyAdvanced {
            let probe = self.probe.as_deref().ok_or_else(|| {
                ProxydiffError::ProbeUnavailable("no metadata probe configured".to_string())
            })?;
            if !probe.available() {
                return Err(ProxydiffError::ProbeUnavailable(
                    "mediainfo CLI is not installed or not on PATH".to_string(),
                ));
            }
        }

        info!("Group 1 ({} directories):", group1_dirs.len());
        let (map1, conflicts1) = self.scan_group(group1_dirs, cancel)?;

        info!("Group 2 ({} directories):", group2_dirs.len());
        let (map2, conflicts2) = self.scan_group(group2_dirs, cancel)?;

        info!(
            "Total found: {} unique files in group 1, {} unique files in group 2",
            map1.len(),
            map2.len()
        );

        let mut result = diff(&map1, &map2, self.mode);
        result.group1_paths = group1_dirs.to_vec();
        result.group2_paths = group2_dirs.to_vec();
        result.group1_conflicts = conflicts1;
        result.group2_conflicts = conflicts2;
        Ok(result)
    }

    /// Scan each directory of one group and merge the results.
    ///
    /// Scans run on a pool bounded by `max_scan_workers`, but results are
    /// collected in input order, so the first-wins merge tie-break follows
    /// the order the directories were listed, not task completion order.
    fn scan_group(
        &self,
        dirs: &[PathBuf],
        cancel: Option<&AtomicBool>,
    ) -> Result<(GroupMap, Vec<Conflict>)> {
        let mut scanner = DirectoryScanner::new(&self.config, self.mode);
        if let Some(probe) = &self.probe {
            scanner = scanner.with_probe(probe.clone());
        }

        let workers = dirs.len().clamp(1, self.config.max_scan_workers.max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| ProxydiffError::Scan(e.to_string()))?;

        let maps = pool.install(|| {
            dirs.par_iter()
                .map(|dir| {
                    let map = scanner.scan_with_cancel(dir, cancel)?;
                    info!("  Scanned {}: {} files", dir.display(), map.len());
                    Ok(map)
                })
                .collect::<Result<Vec<GroupMap>>>()
        })?;

        let (merged, conflicts) = merge_group_maps(maps);
        if !conflicts.is_empty() {
            warn!(
                "{} filename conflicts found (kept first occurrence)",
                conflicts.len()
            );
        }
        Ok((merged, conflicts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct StubProbe {
        up: bool,
        counts: HashMap<String, u64>,
    }

    impl StubProbe {
        fn up(counts: &[(&str, u64)]) -> Arc<Self> {
            Arc::new(Self {
                up: true,
                counts: counts
                    .iter()
                    .map(|(name, frames)| (name.to_string(), *frames))
                    .collect(),
            })
        }

        fn down() -> Arc<Self> {
            Arc::new(Self {
                up: false,
                counts: HashMap::new(),
            })
        }
    }

    impl MetadataProbe for StubProbe {
        fn available(&self) -> bool {
            self.up
        }

        fn frame_count(&self, path: &Path) -> Option<u64> {
            let name = path.file_name()?.to_string_lossy().to_string();
            self.counts.get(&name).copied()
        }
    }

    fn engine(mode: ScanMode) -> CompareEngine {
        CompareEngine::new(ProxydiffConfig::default(), mode)
    }

    #[test]
    fn proxy_mode_end_to_end() {
        let temp = TempDir::new().unwrap();
        let dir_a = temp.path().join("A");
        let dir_b = temp.path().join("B");
        fs::create_dir(&dir_a).unwrap();
        fs::create_dir(&dir_b).unwrap();
        fs::write(dir_a.join("x.mp4"), b"v").unwrap();
        fs::write(dir_a.join("y.mov"), b"v").unwrap();
        fs::write(dir_b.join("y.mp4"), b"v").unwrap();
        fs::write(dir_b.join("z.mov"), b"v").unwrap();

        let result = engine(ScanMode::Proxy)
            .run(&[dir_a], &[dir_b])
            .unwrap();

        let keys1: Vec<&str> = result.unique_to_group1.iter().map(|e| e.key.as_str()).collect();
        let keys2: Vec<&str> = result.unique_to_group2.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys1, vec!["x"]);
        assert_eq!(keys2, vec!["z"]);
        assert!(result.mismatches.is_empty());
    }

    #[test]
    fn missing_directory_fails_before_scanning() {
        let temp = TempDir::new().unwrap();
        let dir_a = temp.path().join("A");
        fs::create_dir(&dir_a).unwrap();
        let missing = temp.path().join("missing");

        let err = engine(ScanMode::Normal)
            .run(&[dir_a], &[missing])
            .unwrap_err();
        assert!(matches!(err, ProxydiffError::PathNotFound(_)));
    }

    #[test]
    fn advanced_mode_without_probe_fails_fast() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();

        let err = engine(ScanMode::ProxyAdvanced)
            .run(&[dir.clone()], &[dir])
            .unwrap_err();
        assert!(matches!(err, ProxydiffError::ProbeUnavailable(_)));
    }

    #[test]
    fn advanced_mode_with_unavailable_probe_fails_fast() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();

        let err = engine(ScanMode::ProxyAdvanced)
            .with_probe(StubProbe::down())
            .run(&[dir.clone()], &[dir])
            .unwrap_err();
        assert!(matches!(err, ProxydiffError::ProbeUnavailable(_)));
    }

    #[test]
    fn advanced_mode_detects_frame_mismatches() {
        let temp = TempDir::new().unwrap();
        let dir_a = temp.path().join("originals");
        let dir_b = temp.path().join("proxies");
        fs::create_dir(&dir_a).unwrap();
        fs::create_dir(&dir_b).unwrap();
        fs::write(dir_a.join("clip.mov"), b"v").unwrap();
        fs::write(dir_a.join("intro.mov"), b"v").unwrap();
        fs::write(dir_b.join("clip.mp4"), b"v").unwrap();
        fs::write(dir_b.join("intro.mp4"), b"v").unwrap();

        let probe = StubProbe::up(&[
            ("clip.mov", 1000),
            ("clip.mp4", 880),
            ("intro.mov", 500),
            ("intro.mp4", 500),
        ]);

        let result = engine(ScanMode::ProxyAdvanced)
            .with_probe(probe)
            .run(&[dir_a], &[dir_b])
            .unwrap();

        assert_eq!(result.mismatches.len(), 1);
        assert_eq!(result.mismatches[0].key, "clip");
        assert_eq!(result.mismatches[0].difference, 120);
    }

    #[test]
    fn multi_directory_group_merges_in_listed_order() {
        let temp = TempDir::new().unwrap();
        let dir_1 = temp.path().join("d1");
        let dir_2 = temp.path().join("d2");
        let other = temp.path().join("other");
        fs::create_dir_all(&dir_1).unwrap();
        fs::create_dir_all(&dir_2).unwrap();
        fs::create_dir_all(&other).unwrap();
        fs::write(dir_1.join("a.mp4"), b"v").unwrap();
        fs::write(dir_2.join("a.mp4"), b"v").unwrap();
        fs::write(dir_2.join("b.mp4"), b"v").unwrap();

        let result = engine(ScanMode::Proxy)
            .run(&[dir_1.clone(), dir_2.clone()], &[other])
            .unwrap();

        assert_eq!(result.group1_conflicts.len(), 1);
        let conflict = &result.group1_conflicts[0];
        assert_eq!(conflict.key, "a");
        assert_eq!(conflict.existing_path, dir_1.join("a.mp4"));
        assert_eq!(conflict.new_path, dir_2.join("a.mp4"));

        // The kept entry is the one from the first listed directory.
        let a = result
            .unique_to_group1
            .iter()
            .find(|e| e.key == "a")
            .unwrap();
        assert_eq!(a.path, dir_1.join("a.mp4"));
    }

    #[test]
    fn pre_cancelled_run_reports_no_partial_results() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().to_path_buf();
        fs::write(dir.join("a.mp4"), b"v").unwrap();

        let cancel = AtomicBool::new(true);
        let err = engine(ScanMode::Proxy)
            .run_with_cancel(&[dir.clone()], &[dir], Some(&cancel))
            .unwrap_err();
        assert!(matches!(err, ProxydiffError::Scan(_)));
    }
}
