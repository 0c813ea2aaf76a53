pub mod comparison;
pub mod differ;
pub mod filter;
pub mod group;
pub mod probe;
pub mod scanner;

pub use comparison::CompareEngine;
pub use differ::diff;
pub use filter::PathFilter;
pub use group::merge_group_maps;
pub use probe::{MediaInfoProbe, MetadataProbe};
pub use scanner::DirectoryScanner;
