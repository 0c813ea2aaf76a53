use crate::{ProxydiffError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE_NAME: &str = "proxydiff.toml";

/// Scan configuration. The skip sets and video extensions default to the
/// fixed sets the comparison was designed around, but live here rather than
/// as module constants so callers and tests can substitute their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxydiffConfig {
    /// Filenames starting with any of these are excluded from every scan.
    #[serde(default = "default_skip_file_prefixes")]
    pub skip_file_prefixes: Vec<String>,

    /// Directories with exactly these names are pruned, subtree included.
    #[serde(default = "default_skip_dir_names")]
    pub skip_dir_names: Vec<String>,

    /// Extensions (lowercase, with dot) recognized as video in proxy modes.
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    /// Extra gitignore-style patterns applied on top of the skip sets.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Upper bound on concurrent directory scans within one group.
    #[serde(default = "default_max_scan_workers")]
    pub max_scan_workers: usize,

    /// Hard per-invocation timeout for the metadata probe, in seconds.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

fn default_skip_file_prefixes() -> Vec<String> {
    [
        "._",              // macOS resource fork files
        ".DS_Store",       // macOS folder metadata
        ".AppleDouble",    // macOS resource fork directory
        ".Spotlight-V100", // macOS spotlight index
        ".Trashes",        // macOS trash
        ".fseventsd",      // macOS file system events
        "Thumbs.db",       // Windows thumbnail cache
        "desktop.ini",     // Windows folder settings
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_dir_names() -> Vec<String> {
    [
        "$RECYCLE.BIN",              // Windows recycle bin
        "System Volume Information", // Windows system folder
        ".Trash",                    // Linux/macOS trash
        "@eaDir",                    // Synology NAS system folder
        "#recycle",                  // Some NAS systems recycle folder
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_video_extensions() -> Vec<String> {
    [
        ".mp4", ".mov", ".mxf", ".avi", ".wmv", ".mkv", ".m4v", ".mpg",
        ".mpeg", ".webm", ".flv", ".vob", ".ogv", ".ogg", ".dv", ".qt",
        ".f4v", ".m2ts", ".ts", ".3gp", ".3g2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_scan_workers() -> usize {
    4
}

fn default_probe_timeout_secs() -> u64 {
    30
}

impl Default for ProxydiffConfig {
    fn default() -> Self {
        Self {
            skip_file_prefixes: default_skip_file_prefixes(),
            skip_dir_names: default_skip_dir_names(),
            video_extensions: default_video_extensions(),
            ignore_patterns: Vec::new(),
            max_scan_workers: default_max_scan_workers(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ProxydiffConfig,
    pub path: PathBuf,
    pub exists: bool,
}

/// Load the user configuration, falling back to defaults when no file exists.
pub fn load_config() -> Result<LoadedConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

/// Load configuration from an explicit path (e.g. a `--config` override).
pub fn load_config_from(path: &Path) -> Result<LoadedConfig> {
    let exists = path.exists();

    let config = if exists {
        let data = fs::read_to_string(path)?;
        toml::from_str(&data).map_err(|e| ProxydiffError::Serialization(e.to_string()))?
    } else {
        ProxydiffConfig::default()
    };

    Ok(LoadedConfig {
        config,
        path: path.to_path_buf(),
        exists,
    })
}

pub fn save_config(path: &Path, config: &ProxydiffConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(config)
        .map_err(|e| ProxydiffError::Serialization(e.to_string()))?;
    fs::write(path, data)?;
    Ok(())
}

fn resolve_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "proxydiff", "proxydiff")
        .ok_or_else(|| ProxydiffError::Config("Unable to determine config directory".to_string()))?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}
