//! Discovery of target folders named after a screen setup.
//!
//! A target folder's name encodes the screen arrangement and vertical
//! resolution, e.g. `h2_1440p` for two horizontal screens at 1440p.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::fs::FileSystem;

static TARGET_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z][0-9]+)+_[0-9]+p$").expect("valid regex"));

/// A folder that receives the wallpapers of one screen setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFolder {
    /// Path of the folder.
    pub path: PathBuf,
    /// Lowercased folder name, used to look up the remote index.
    pub setup: String,
}

impl TargetFolder {
    /// Builds a target folder from a path whose name matches the pattern.
    ///
    /// Returns `None` when the name does not qualify.
    #[must_use]
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if !is_target_folder_name(name) {
            return None;
        }
        let setup = name.to_lowercase();
        Some(Self { path, setup })
    }
}

/// Returns true if `name` is one or more letter+digits groups, an
/// underscore, digits and a trailing `p`.
#[must_use]
pub fn is_target_folder_name(name: &str) -> bool {
    TARGET_NAME_RE.is_match(name)
}

/// Lists the immediate subdirectories of `root` that qualify as target folders.
///
/// # Errors
///
/// Returns an error if `root` cannot be read.
pub async fn list_target_folders<F: FileSystem + ?Sized>(
    fs: &F,
    root: &Path,
) -> Result<Vec<TargetFolder>> {
    let folders = fs
        .list_dirs(root)
        .await?
        .into_iter()
        .filter_map(TargetFolder::from_path)
        .collect();
    Ok(folders)
}
