//! Selection of the images that are not yet present locally.

use std::path::PathBuf;

use reqwest::Url;

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::target::TargetFolder;

/// Returns the last path segment of `url`.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `url` cannot be parsed or its path does
/// not end in a file name.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let invalid = || Error::InvalidUrl {
        url: url.to_string(),
    };
    let parsed = Url::parse(url).map_err(|_| invalid())?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(invalid)
}

/// Computes where the image at `url` is stored inside `folder`.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if no file name can be derived from `url`.
pub fn local_file(folder: &TargetFolder, url: &str) -> Result<PathBuf> {
    Ok(folder.path.join(file_name_from_url(url)?))
}

/// Returns the URLs, in list order, whose local file does not exist.
///
/// URLs without a usable file name are kept so the download step reports them.
pub async fn select_missing<F: FileSystem + ?Sized>(
    fs: &F,
    folder: &TargetFolder,
    urls: &[String],
) -> Vec<String> {
    let mut missing = Vec::new();
    for url in urls {
        let present = match local_file(folder, url) {
            Ok(path) => fs.file_exists(&path).await,
            Err(_) => false,
        };
        if !present {
            missing.push(url.clone());
        }
    }
    missing
}
