//! Orchestration of a whole synchronization run.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::delta::select_missing;
use crate::download::{DownloadOutcome, Downloader};
use crate::error::Result;
use crate::fs::{FileSystem, TokioFileSystem};
use crate::index::fetch_url_list;
use crate::progress::{ProgressReporter, TransferProgress};
use crate::target::list_target_folders;
use crate::transport::{HttpTransport, Transport};

const NO_TARGETS_HELP: &str = concat!(
    "Create a folder in the current directory for each resolution you wish to download.\n",
    "The folder must have a name like \"<screens>_<vertical resolution>p\".\n",
    "E.g. to download wallpapers for two horizontal WQHD screens, ",
    "create the folder \"h2_1440p\".",
);

/// Counters accumulated over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    /// Number of target folders found.
    pub folders: usize,
    /// Number of failed (or cancelled) download calls.
    pub errors: usize,
    /// Number of images transferred.
    pub downloaded: usize,
    /// Number of listed images that were already present.
    pub already_present: usize,
    /// Whether cancellation was requested during the run.
    pub cancelled: bool,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No target folders exist; nothing to do.
    NoTargets,
    /// The working directory could not be scanned.
    ScanFailed,
    /// Every missing image was downloaded.
    Finished,
    /// At least one download failed.
    FinishedWithErrors,
    /// Cancellation was requested.
    Cancelled,
}

impl RunOutcome {
    /// Returns true if the run counts as successful.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::NoTargets | Self::Finished)
    }

    /// Returns the process exit code for this outcome.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Counters at the end of the run.
    pub state: RunState,
}

/// Drives folder discovery, index retrieval and downloads.
pub struct RunController<T: Transport = HttpTransport, F: FileSystem = TokioFileSystem> {
    config: RunConfig,
    downloader: Downloader<T, F>,
}

impl RunController<HttpTransport, TokioFileSystem> {
    /// Creates a controller that talks HTTP and renders to `view`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: RunConfig,
        view: Arc<dyn TransferProgress>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let reporter = Arc::new(ProgressReporter::new(view));
        let downloader = Downloader::new(HttpTransport::new()?, reporter, cancel);
        Ok(Self::with_downloader(config, downloader))
    }
}

impl<T: Transport, F: FileSystem> RunController<T, F> {
    /// Creates a controller around an existing downloader.
    #[must_use]
    pub const fn with_downloader(config: RunConfig, downloader: Downloader<T, F>) -> Self {
        Self { config, downloader }
    }

    fn say(&self, msg: &str) {
        self.downloader.reporter().println(msg);
    }

    fn should_stop(&self, state: &RunState) -> bool {
        self.downloader.cancel_token().is_cancelled() || state.errors > self.config.max_errors
    }

    /// Runs the synchronization. Never fails; all errors end up in the report.
    pub async fn run(&self) -> RunReport {
        let mut state = RunState::default();
        let fs = self.downloader.fs();

        let folders = match list_target_folders(fs, &self.config.root_dir).await {
            Ok(folders) => folders,
            Err(e) => {
                log::error!("Failed to scan {}: {e}", self.config.root_dir.display());
                return RunReport {
                    outcome: RunOutcome::ScanFailed,
                    state,
                };
            }
        };
        state.folders = folders.len();

        if folders.is_empty() {
            self.say("No target folders found.");
            self.say("");
            self.say(NO_TARGETS_HELP);
            return RunReport {
                outcome: RunOutcome::NoTargets,
                state,
            };
        }
        self.say(&format!("Found {} target folders.", folders.len()));

        for folder in &folders {
            if self.should_stop(&state) {
                break;
            }
            self.say(&format!("Retrieving image URLs for {}...", folder.setup));
            let urls = fetch_url_list(
                self.downloader.transport(),
                self.downloader.reporter(),
                self.downloader.cancel_token(),
                &self.config.base_url,
                &folder.setup,
            )
            .await;
            self.say(&format!("Found {} image URLs.", urls.len()));

            let missing = select_missing(fs, folder, &urls).await;
            state.already_present += urls.len() - missing.len();
            if missing.is_empty() {
                self.say("All images are already there.");
            } else {
                self.say(&format!("Downloading {} missing images...", missing.len()));
            }

            for url in &missing {
                if self.should_stop(&state) {
                    break;
                }
                let outcome = self.downloader.download_one(folder, url).await;
                match outcome {
                    DownloadOutcome::Downloaded(_) => state.downloaded += 1,
                    DownloadOutcome::AlreadyPresent => state.already_present += 1,
                    DownloadOutcome::Failed | DownloadOutcome::Cancelled => {}
                }
                if !outcome.succeeded() {
                    state.errors += 1;
                }
            }
        }

        state.cancelled = self.downloader.cancel_token().is_cancelled();
        let outcome = if state.cancelled {
            self.say("Cancelled by user.");
            RunOutcome::Cancelled
        } else if state.errors > 0 {
            self.say("Finished with errors.");
            RunOutcome::FinishedWithErrors
        } else {
            self.say("Finished.");
            RunOutcome::Finished
        };
        log::debug!("Run ended: {outcome:?} {state:?}");

        RunReport { outcome, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::io::{AsyncWrite, AsyncWriteExt};

    const BASE: &str = "https://panowall.test/";
    const THREE_IMAGES: [&str; 3] = [
        "https://img.test/1.jpg",
        "https://img.test/2.jpg",
        "https://img.test/3.jpg",
    ];

    enum Reply {
        Body(&'static str),
        Fail,
        CancelAndStall(CancellationToken),
    }

    /// Routes URLs to canned replies and records every request.
    #[derive(Default)]
    struct FakeRemote {
        routes: HashMap<String, Reply>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeRemote {
        fn route(mut self, url: &str, reply: Reply) -> Self {
            self.routes.insert(url.to_string(), reply);
            self
        }

        fn index(self, setup: &str, urls: &[&str]) -> Self {
            let body: String = urls.iter().map(|u| format!("{u}\n")).collect();
            let url = format!("{BASE}data/{setup}.txt");
            self.route(&url, Reply::Body(Box::leak(body.into_boxed_str())))
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeRemote {
        async fn fetch(
            &self,
            url: &str,
            sink: &mut (dyn AsyncWrite + Send + Unpin),
            _on_progress: &(dyn Fn(u64, Option<u64>) + Send + Sync),
        ) -> crate::Result<u64> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.routes.get(url) {
                Some(Reply::Body(body)) => {
                    sink.write_all(body.as_bytes()).await?;
                    sink.flush().await?;
                    Ok(body.len() as u64)
                }
                Some(Reply::CancelAndStall(token)) => {
                    sink.write_all(b"partial").await?;
                    sink.flush().await?;
                    token.cancel();
                    futures::future::pending::<()>().await;
                    Ok(0)
                }
                Some(Reply::Fail) | None => Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    format!("no route to {url}"),
                ))),
            }
        }
    }

    #[derive(Default)]
    struct Messages(Mutex<Vec<String>>);

    impl TransferProgress for Messages {
        fn on_message(&self, msg: &str) {
            self.0.lock().unwrap().push(msg.to_string());
        }
    }

    struct Harness {
        dir: TempDir,
        messages: Arc<Messages>,
        controller: RunController<FakeRemote>,
    }

    impl Harness {
        fn new(folders: &[&str], remote: FakeRemote, cancel: CancellationToken) -> Self {
            let dir = TempDir::new().unwrap();
            for folder in folders {
                std::fs::create_dir(dir.path().join(folder)).unwrap();
            }
            let messages = Arc::new(Messages::default());
            let reporter = Arc::new(ProgressReporter::new(messages.clone()));
            let config = RunConfig::new()
                .with_base_url(BASE)
                .with_root_dir(dir.path());
            let controller =
                RunController::with_downloader(config, Downloader::new(remote, reporter, cancel));
            Self {
                dir,
                messages,
                controller,
            }
        }

        fn folder(&self, name: &str) -> std::path::PathBuf {
            self.dir.path().join(name)
        }

        fn remote(&self) -> &FakeRemote {
            self.controller.downloader.transport()
        }

        fn messages(&self) -> Vec<String> {
            self.messages.0.lock().unwrap().clone()
        }
    }

    fn touch(path: &Path) {
        std::fs::write(path, b"existing").unwrap();
    }

    #[test]
    fn exit_codes() {
        assert_eq!(RunOutcome::NoTargets.exit_code(), 0);
        assert_eq!(RunOutcome::Finished.exit_code(), 0);
        assert_eq!(RunOutcome::FinishedWithErrors.exit_code(), 1);
        assert_eq!(RunOutcome::Cancelled.exit_code(), 1);
        assert_eq!(RunOutcome::ScanFailed.exit_code(), 1);
    }

    #[tokio::test]
    async fn no_target_folders_succeeds() {
        let h = Harness::new(
            &["photos", "h1_1080"],
            FakeRemote::default(),
            CancellationToken::new(),
        );

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::NoTargets);
        assert!(report.outcome.is_success());
        assert_eq!(h.messages()[0], "No target folders found.");
        assert!(h.remote().requests().is_empty());
    }

    #[tokio::test]
    async fn downloads_every_listed_image_in_order() {
        let remote = FakeRemote::default()
            .index("h1_1080p", &THREE_IMAGES)
            .route("https://img.test/1.jpg", Reply::Body("one"))
            .route("https://img.test/2.jpg", Reply::Body("two"))
            .route("https://img.test/3.jpg", Reply::Body("three"));
        let h = Harness::new(&["h1_1080p"], remote, CancellationToken::new());

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::Finished);
        assert_eq!(report.state.downloaded, 3);
        assert_eq!(report.state.errors, 0);
        assert_eq!(
            h.remote().requests(),
            [
                "https://panowall.test/data/h1_1080p.txt",
                "https://img.test/1.jpg",
                "https://img.test/2.jpg",
                "https://img.test/3.jpg",
            ]
        );
        assert_eq!(std::fs::read(h.folder("h1_1080p").join("3.jpg")).unwrap(), b"three");
        assert_eq!(
            h.messages(),
            [
                "Found 1 target folders.",
                "Retrieving image URLs for h1_1080p...",
                "Found 3 image URLs.",
                "Downloading 3 missing images...",
                "Finished.",
            ]
        );
    }

    #[tokio::test]
    async fn only_missing_images_are_downloaded() {
        let remote = FakeRemote::default()
            .index("h1_1080p", &THREE_IMAGES)
            .route("https://img.test/2.jpg", Reply::Body("two"));
        let h = Harness::new(&["h1_1080p"], remote, CancellationToken::new());
        touch(&h.folder("h1_1080p").join("1.jpg"));
        touch(&h.folder("h1_1080p").join("3.jpg"));

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::Finished);
        assert_eq!(report.state.downloaded, 1);
        assert_eq!(report.state.already_present, 2);
        assert_eq!(
            h.remote().requests(),
            ["https://panowall.test/data/h1_1080p.txt", "https://img.test/2.jpg"]
        );
    }

    #[tokio::test]
    async fn complete_folder_reports_nothing_missing() {
        let remote = FakeRemote::default().index("v1_1080p", &["https://img.test/1.jpg"]);
        let h = Harness::new(&["v1_1080p"], remote, CancellationToken::new());
        touch(&h.folder("v1_1080p").join("1.jpg"));

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::Finished);
        assert!(h.messages().contains(&"All images are already there.".to_string()));
    }

    #[tokio::test]
    async fn index_failure_is_not_an_error() {
        let remote =
            FakeRemote::default().route("https://panowall.test/data/h1_1080p.txt", Reply::Fail);
        let h = Harness::new(&["h1_1080p"], remote, CancellationToken::new());

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::Finished);
        assert_eq!(report.state.errors, 0);
        assert_eq!(h.remote().requests().len(), 1);
        assert!(h.messages().contains(&"Found 0 image URLs.".to_string()));
    }

    #[tokio::test]
    async fn index_failure_then_download_error_in_later_folder() {
        let remote = FakeRemote::default()
            .route("https://panowall.test/data/h1_1080p.txt", Reply::Fail)
            .index("h2_1440p", &["https://img.test/wide.jpg"])
            .route("https://img.test/wide.jpg", Reply::Fail);
        let h = Harness::new(&["h1_1080p", "h2_1440p"], remote, CancellationToken::new());

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::FinishedWithErrors);
        assert_eq!(report.state.errors, 1);
        assert_eq!(report.outcome.exit_code(), 1);
    }

    #[tokio::test]
    async fn cancellation_mid_transfer_removes_file_and_stops() {
        let cancel = CancellationToken::new();
        let remote = FakeRemote::default()
            .index("h1_1080p", &["https://img.test/1.jpg", "https://img.test/2.jpg"])
            .route("https://img.test/1.jpg", Reply::CancelAndStall(cancel.clone()))
            .route("https://img.test/2.jpg", Reply::Body("two"))
            .index("h2_1440p", &["https://img.test/3.jpg"]);
        let h = Harness::new(&["h1_1080p", "h2_1440p"], remote, cancel);

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::Cancelled);
        assert!(report.state.cancelled);
        assert_eq!(report.outcome.exit_code(), 1);
        assert!(!h.folder("h1_1080p").join("1.jpg").exists());
        assert_eq!(
            h.remote().requests(),
            ["https://panowall.test/data/h1_1080p.txt", "https://img.test/1.jpg"]
        );
        assert_eq!(h.messages().last().unwrap(), "Cancelled by user.");
    }

    #[tokio::test]
    async fn error_threshold_aborts_the_run() {
        let urls: Vec<String> = (1..=6).map(|i| format!("https://img.test/{i}.jpg")).collect();
        let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let remote = FakeRemote::default()
            .index("h1_1080p", &url_refs)
            .index("h2_1440p", &["https://img.test/other.jpg"]);
        let h = Harness::new(&["h1_1080p", "h2_1440p"], remote, CancellationToken::new());

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::FinishedWithErrors);
        assert_eq!(report.state.errors, 4);
        let requests = h.remote().requests();
        assert_eq!(requests.len(), 5);
        assert_eq!(requests[4], "https://img.test/4.jpg");
        assert!(!requests.iter().any(|r| r.contains("h2_1440p")));
        assert_eq!(h.messages().last().unwrap(), "Finished with errors.");
    }

    #[tokio::test]
    async fn errors_at_threshold_do_not_abort() {
        let remote = FakeRemote::default()
            .index("h1_1080p", &THREE_IMAGES)
            .index("h2_1440p", &["https://img.test/ok.jpg"])
            .route("https://img.test/ok.jpg", Reply::Body("ok"));
        let h = Harness::new(&["h1_1080p", "h2_1440p"], remote, CancellationToken::new());

        let report = h.controller.run().await;
        assert_eq!(report.state.errors, 3);
        assert_eq!(report.state.downloaded, 1);
        assert_eq!(report.outcome, RunOutcome::FinishedWithErrors);
    }

    #[tokio::test]
    async fn missing_root_is_reported() {
        let mut h = Harness::new(&[], FakeRemote::default(), CancellationToken::new());
        h.controller.config.root_dir = h.dir.path().join("missing");

        let report = h.controller.run().await;
        assert_eq!(report.outcome, RunOutcome::ScanFailed);
        assert!(!report.outcome.is_success());
    }
}
