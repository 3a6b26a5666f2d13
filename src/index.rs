//! Retrieval of the per-setup list of image URLs.

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::progress::{ProgressReporter, percent};
use crate::transport::Transport;

/// Builds the address of the index file for `setup`.
#[must_use]
pub fn index_url(base_url: &str, setup: &str) -> String {
    format!("{}/data/{setup}.txt", base_url.trim_end_matches('/'))
}

/// Splits an index body into URLs, dropping empty lines.
#[must_use]
pub fn parse_url_list(body: &str) -> Vec<String> {
    body.split(['\r', '\n'])
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fetches the image URLs listed for `setup`.
///
/// Failures are logged and yield an empty list: an unreachable index reads as
/// "nothing to download" and does not count as a download error.
pub async fn fetch_url_list<T: Transport + ?Sized>(
    transport: &T,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
    base_url: &str,
    setup: &str,
) -> Vec<String> {
    let url = index_url(base_url, setup);
    let mut body: Vec<u8> = Vec::new();

    reporter.begin(&url, None);
    let on_progress = |received, total| {
        if let Some(pct) = percent(received, total) {
            reporter.update(pct);
        }
    };
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        res = transport.fetch(&url, &mut body, &on_progress) => res,
    };
    reporter.end();
    reporter.wait_idle().await;

    match result {
        Ok(_) => parse_url_list(&String::from_utf8_lossy(&body)),
        Err(e) => {
            log::error!("Failed to retrieve {url}: {e}");
            Vec::new()
        }
    }
}
