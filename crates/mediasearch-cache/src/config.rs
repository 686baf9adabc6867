//! Cache root configuration (spec §6.2/§6.3).

use std::path::{Path, PathBuf};

/// Where derivatives and temp files live, and whether RAW files may stand in
/// for their own previews (`MEDIA_SEARCH_USE_RAW_PREVIEWS`).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub data_dir: PathBuf,
    pub forensics_dir: PathBuf,
    pub use_raw_previews: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            forensics_dir: PathBuf::from("./data/forensics"),
            use_raw_previews: true,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("MEDIA_SEARCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));
        let forensics_dir = std::env::var("MEDIASEARCH_FORENSICS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("forensics"));
        let use_raw_previews = std::env::var("MEDIA_SEARCH_USE_RAW_PREVIEWS")
            .map(|v| v != "false")
            .unwrap_or(true);

        Self {
            data_dir,
            forensics_dir,
            use_raw_previews,
        }
    }

    pub fn tmp_dir(&self, library_slug: &str) -> PathBuf {
        self.data_dir.join("tmp").join(library_slug)
    }

    pub fn resolve(&self, relative: &Path) -> PathBuf {
        self.data_dir.join(relative)
    }
}
