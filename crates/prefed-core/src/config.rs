use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// Environment variable naming the store file.
pub const STORE_ENV: &str = "PREFED_STORE";
pub const DEFAULT_STORE_FILE: &str = "preferences.json";

/// Where a store path came from, for status lines and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreSource {
    Flag,
    Env,
    ProjectDir,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub source: StoreSource,
}

impl StoreLocation {
    /// Resolve the store path: explicit flag, then `PREFED_STORE`, then the
    /// platform config directory, then `./.config`.
    pub fn resolve(flag: Option<PathBuf>) -> Self {
        Self::resolve_with(flag, env::var_os(STORE_ENV).map(PathBuf::from))
    }

    pub fn resolve_with(flag: Option<PathBuf>, env_path: Option<PathBuf>) -> Self {
        if let Some(path) = flag {
            return Self {
                path,
                source: StoreSource::Flag,
            };
        }
        if let Some(path) = env_path.filter(|p| !p.as_os_str().is_empty()) {
            return Self {
                path,
                source: StoreSource::Env,
            };
        }
        match project_directory() {
            Some(dirs) => Self {
                path: dirs.config_dir().join(DEFAULT_STORE_FILE),
                source: StoreSource::ProjectDir,
            },
            None => Self {
                path: PathBuf::from(".").join(".config").join(DEFAULT_STORE_FILE),
                source: StoreSource::Fallback,
            },
        }
    }
}

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "prefed", "prefed")
}

/// Create the directory a store file will be written into.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent)
        }
        _ => Ok(()),
    }
}
