use proxydiff_common::ProxydiffConfig;
use std::collections::HashSet;
use std::path::Path;

/// Pure predicates over the configured skip sets. No I/O, no state.
#[derive(Debug, Clone)]
pub struct PathFilter {
    skip_file_prefixes: Vec<String>,
    skip_dir_names: HashSet<String>,
}

impl PathFilter {
    pub fn new(config: &ProxydiffConfig) -> Self {
        Self {
            skip_file_prefixes: config.skip_file_prefixes.clone(),
            skip_dir_names: config.skip_dir_names.iter().cloned().collect(),
        }
    }

    /// True if the filename starts with any configured OS-metadata prefix.
    pub fn is_skipped_file_name(&self, name: &str) -> bool {
        self.skip_file_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// True if the directory name exactly matches a configured system/trash
    /// directory name.
    pub fn is_skipped_dir_name(&self, name: &str) -> bool {
        self.skip_dir_names.contains(name)
    }

    /// True if any segment of the path is a skipped directory name. Used to
    /// re-check paths even when the walk already pruned skipped subtrees.
    pub fn path_contains_skipped_dir(&self, path: &Path) -> bool {
        path.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .map_or(false, |name| self.skip_dir_names.contains(name))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn default_filter() -> PathFilter {
        PathFilter::new(&ProxydiffConfig::default())
    }

    #[test]
    fn skips_os_metadata_files() {
        let filter = default_filter();
        assert!(filter.is_skipped_file_name(".DS_Store"));
        assert!(filter.is_skipped_file_name("._clip.mov"));
        assert!(filter.is_skipped_file_name("Thumbs.db"));
        assert!(filter.is_skipped_file_name("desktop.ini"));
        assert!(!filter.is_skipped_file_name("clip.mov"));
        assert!(!filter.is_skipped_file_name("DS_Store.txt"));
    }

    #[test]
    fn skips_system_directories_by_exact_name() {
        let filter = default_filter();
        assert!(filter.is_skipped_dir_name("$RECYCLE.BIN"));
        assert!(filter.is_skipped_dir_name(".Trash"));
        assert!(filter.is_skipped_dir_name("@eaDir"));
        assert!(!filter.is_skipped_dir_name("footage"));
        // Exact match only, not substring
        assert!(!filter.is_skipped_dir_name(".Trashcan"));
    }

    #[test]
    fn detects_skipped_directory_in_path() {
        let filter = default_filter();
        assert!(filter.path_contains_skipped_dir(&PathBuf::from("/vol/$RECYCLE.BIN/clip.mov")));
        assert!(filter.path_contains_skipped_dir(&PathBuf::from("media/@eaDir/thumb")));
        assert!(!filter.path_contains_skipped_dir(&PathBuf::from("/vol/footage/clip.mov")));
    }

    #[test]
    fn custom_skip_sets_replace_defaults() {
        let config = ProxydiffConfig {
            skip_file_prefixes: vec!["~tmp".to_string()],
            skip_dir_names: vec!["scratch".to_string()],
            ..ProxydiffConfig::default()
        };
        let filter = PathFilter::new(&config);
        assert!(filter.is_skipped_file_name("~tmp_render.mov"));
        assert!(!filter.is_skipped_file_name(".DS_Store"));
        assert!(filter.is_skipped_dir_name("scratch"));
        assert!(!filter.is_skipped_dir_name("$RECYCLE.BIN"));
    }
}
