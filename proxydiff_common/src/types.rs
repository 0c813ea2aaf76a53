use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A scanned file keyed for comparison.
///
/// `frame_count` is only populated under [`ScanMode::ProxyAdvanced`]; it is
/// `None` when the probe failed or the file is not a recognized video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Comparison identity: full filename in Normal mode, stem in proxy modes.
    pub key: String,
    pub path: PathBuf,
    pub filename: String,
    pub frame_count: Option<u64>,
}

/// All retained files of one scan or one merged group, keyed by comparison
/// identity. Each key maps to exactly one entry.
pub type GroupMap = HashMap<String, FileEntry>;

/// How files are filtered and keyed during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Every unfiltered file, keyed by full filename.
    Normal,
    /// Video files only, keyed by filename stem so originals and proxies
    /// with different containers collide by design.
    Proxy,
    /// Proxy keying plus a frame count per file from the metadata probe.
    ProxyAdvanced,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Normal => "normal",
            ScanMode::Proxy => "proxy",
            ScanMode::ProxyAdvanced => "proxy_advanced",
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, ScanMode::Proxy | ScanMode::ProxyAdvanced)
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two directories in the same group produced the same key. The first
/// occurrence is kept; the conflict is diagnostic, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub key: String,
    pub existing_path: PathBuf,
    pub new_path: PathBuf,
}

/// A key present in both groups whose two files report different frame counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameMismatch {
    pub key: String,
    pub path1: PathBuf,
    pub path2: PathBuf,
    pub filename1: String,
    pub filename2: String,
    pub frames1: u64,
    pub frames2: u64,
    pub difference: u64,
}

/// The immutable outcome of one comparison run, handed to the exporters.
///
/// `unique_to_group1`/`unique_to_group2` are sorted by key; `mismatches` are
/// sorted by descending difference with ties broken by ascending key, so
/// repeated runs over unchanged trees produce identical output.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub mode: ScanMode,
    pub group1_paths: Vec<PathBuf>,
    pub group2_paths: Vec<PathBuf>,
    pub unique_to_group1: Vec<FileEntry>,
    pub unique_to_group2: Vec<FileEntry>,
    pub mismatches: Vec<FrameMismatch>,
    pub group1_conflicts: Vec<Conflict>,
    pub group2_conflicts: Vec<Conflict>,
}
