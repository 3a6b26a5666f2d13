//! panowall - keeps local wallpaper folders in sync with the panowall index.
//!
//! Every folder in the working directory whose name encodes a screen setup
//! (e.g. `h2_1440p`) receives the images listed at
//! `<base>/data/<setup>.txt`. Only images missing locally are downloaded,
//! strictly one at a time.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use panowall::{ConsoleProgress, RunConfig, RunController};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> panowall::Result<()> {
//! let cancel = CancellationToken::new();
//! let controller = RunController::new(
//!     RunConfig::default(),
//!     Arc::new(ConsoleProgress::stdout()),
//!     cancel,
//! )?;
//!
//! let report = controller.run().await;
//! println!("{} images downloaded", report.state.downloaded);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod delta;
pub mod download;
pub mod error;
pub mod fs;
pub mod index;
pub mod progress;
pub mod run;
pub mod shutdown;
pub mod target;
pub mod transport;

// Re-export main types for convenience
pub use config::RunConfig;
pub use delta::{file_name_from_url, local_file, select_missing};
pub use download::{DownloadOutcome, Downloader};
pub use error::{Error, Result};
pub use fs::{FileSystem, TokioFileSystem};
pub use index::{fetch_url_list, index_url, parse_url_list};
pub use progress::{
    ConsoleProgress, DownloadSession, NoProgress, ProgressReporter, TransferProgress,
};
pub use run::{RunController, RunOutcome, RunReport, RunState};
pub use shutdown::spawn_shutdown_listener;
pub use target::{TargetFolder, is_target_folder_name, list_target_folders};
pub use transport::{HttpTransport, Transport};
