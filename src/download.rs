//! Transfer of single images into their target folder.

use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::delta::local_file;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::progress::{ProgressReporter, percent};
use crate::target::TargetFolder;
use crate::transport::{HttpTransport, Transport};

/// Result of a single [`Downloader::download_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The image was transferred; carries the number of bytes written.
    Downloaded(u64),
    /// The local file already existed, nothing was transferred.
    AlreadyPresent,
    /// The transfer failed; whatever was written is left on disk.
    Failed,
    /// The transfer was aborted and the partial file removed.
    Cancelled,
}

impl DownloadOutcome {
    /// Returns true if the image is now present locally.
    #[must_use]
    pub const fn succeeded(self) -> bool {
        matches!(self, Self::Downloaded(_) | Self::AlreadyPresent)
    }
}

/// Downloads images one at a time, reporting progress and honoring cancellation.
pub struct Downloader<T: Transport = HttpTransport, F: FileSystem = TokioFileSystem> {
    transport: T,
    fs: F,
    reporter: Arc<ProgressReporter>,
    cancel: CancellationToken,
}

impl<T: Transport> Downloader<T, TokioFileSystem> {
    /// Creates a new downloader with the default file system.
    #[must_use]
    pub const fn new(
        transport: T,
        reporter: Arc<ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            fs: TokioFileSystem,
            reporter,
            cancel,
        }
    }
}

impl<T: Transport, F: FileSystem> Downloader<T, F> {
    /// Creates a new downloader with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(
        transport: T,
        fs: F,
        reporter: Arc<ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            fs,
            reporter,
            cancel,
        }
    }

    /// Returns a reference to the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a reference to the file system.
    #[must_use]
    pub const fn fs(&self) -> &F {
        &self.fs
    }

    /// Returns the progress reporter shared with the run.
    #[must_use]
    pub const fn reporter(&self) -> &Arc<ProgressReporter> {
        &self.reporter
    }

    /// Returns the cancellation token observed by transfers.
    #[must_use]
    pub const fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Downloads `url` into `folder` unless the file is already there.
    ///
    /// Returns only after the transfer's end has been signalled, so calls
    /// never overlap.
    pub async fn download_one(&self, folder: &TargetFolder, url: &str) -> DownloadOutcome {
        let target = match local_file(folder, url) {
            Ok(path) => path,
            Err(e) => {
                log::error!("Cannot download {url}: {e}");
                return DownloadOutcome::Failed;
            }
        };
        if self.fs.file_exists(&target).await {
            log::debug!("Skipping {url}: {} exists", target.display());
            return DownloadOutcome::AlreadyPresent;
        }

        self.reporter.begin(url, Some(target.clone()));
        let result = self.transfer(url, &target).await;
        let session = self.reporter.end();
        self.reporter.wait_idle().await;

        match result {
            Ok(bytes) => {
                log::debug!("Downloaded {url} ({bytes} bytes)");
                DownloadOutcome::Downloaded(bytes)
            }
            Err(e) if matches!(e, Error::Cancelled) || self.cancel.is_cancelled() => {
                if let Some(session) = session {
                    if let Some(partial) = &session.target {
                        self.remove_partial(partial).await;
                    }
                    log::info!("Cancelled download of {}", session.url);
                }
                DownloadOutcome::Cancelled
            }
            Err(e) => {
                log::error!("Failed to download {url}: {e}");
                DownloadOutcome::Failed
            }
        }
    }

    async fn transfer(&self, url: &str, target: &Path) -> Result<u64> {
        let mut file = self.fs.create_file(target).await?;
        let reporter = &self.reporter;
        let on_progress = |received, total| {
            if let Some(pct) = percent(received, total) {
                reporter.update(pct);
            }
        };
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Error::Cancelled),
            res = self.transport.fetch(url, &mut file, &on_progress) => res,
        };
        if result.is_err() {
            // Let pending writes land so the handle is closed before any cleanup.
            if let Err(e) = file.shutdown().await {
                log::debug!("Failed to close {}: {e}", target.display());
            }
        }
        result
    }

    async fn remove_partial(&self, path: &Path) {
        match self.fs.remove_file(path).await {
            Ok(()) => log::debug!("Removed partial file {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove partial file {}: {e}", path.display()),
        }
    }
}
