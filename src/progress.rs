//! In-place progress reporting for sequential transfers.
//!
//! [`ProgressReporter`] owns the state of the transfer currently in flight
//! and forwards rendering to a [`TransferProgress`] view. Progress callbacks
//! may arrive from a different task than the driving loop, so every console
//! mutation is serialized behind a lock.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use console::Term;
use tokio::sync::watch;

/// Percentages at or above this value are not redrawn.
const NEAR_COMPLETE: u8 = 99;

/// Trait for rendering transfer progress.
///
/// All methods have default no-op implementations for convenience.
pub trait TransferProgress: Send + Sync {
    /// Called when a transfer starts.
    fn on_start(&self, _url: &str) {}

    /// Called when the integer percentage of the running transfer changes.
    fn on_progress(&self, _percent: u8) {}

    /// Called when a transfer ends, whatever its outcome.
    fn on_end(&self) {}

    /// Called for status lines that are not part of a transfer.
    fn on_message(&self, _msg: &str) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl TransferProgress for NoProgress {}

/// Renders `<url> [ 42% ]` on a single line and erases it when done.
pub struct ConsoleProgress<W: Write + Send = Term> {
    out: Mutex<ConsoleLine<W>>,
    interactive: bool,
}

struct ConsoleLine<W> {
    out: W,
    width: usize,
}

impl ConsoleProgress<Term> {
    /// Creates a view on standard output.
    ///
    /// The in-place indicator is only drawn when stdout is a terminal.
    #[must_use]
    pub fn stdout() -> Self {
        let term = Term::stdout();
        let interactive = term.is_term();
        Self::new(term, interactive)
    }
}

impl<W: Write + Send> ConsoleProgress<W> {
    /// Creates a view on an arbitrary writer.
    pub const fn new(out: W, interactive: bool) -> Self {
        Self {
            out: Mutex::new(ConsoleLine { out, width: 0 }),
            interactive,
        }
    }

    /// Consumes the view and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }

    fn line(&self) -> MutexGuard<'_, ConsoleLine<W>> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> TransferProgress for ConsoleProgress<W> {
    fn on_start(&self, url: &str) {
        if !self.interactive {
            return;
        }
        let mut line = self.line();
        let text = format!("{url} [ 00% ]");
        line.width = console::measure_text_width(&text);
        let _ = write!(line.out, "{text}");
        let _ = line.out.flush();
    }

    fn on_progress(&self, percent: u8) {
        if !self.interactive {
            return;
        }
        let mut line = self.line();
        if line.width == 0 {
            return;
        }
        let _ = write!(line.out, "\x08\x08\x08\x08\x08{percent:02}% ]");
        let _ = line.out.flush();
    }

    fn on_end(&self) {
        let mut line = self.line();
        if line.width == 0 {
            return;
        }
        let blank = " ".repeat(line.width);
        let _ = write!(line.out, "\r{blank}\r");
        let _ = line.out.flush();
        line.width = 0;
    }

    fn on_message(&self, msg: &str) {
        let mut line = self.line();
        let _ = writeln!(line.out, "{msg}");
        let _ = line.out.flush();
    }
}

/// State of the transfer currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSession {
    /// URL being transferred.
    pub url: String,
    /// Destination file; `None` for index fetches.
    pub target: Option<PathBuf>,
    /// Last percentage handed to the view.
    pub last_percent: u8,
}

/// Computes the integer percentage of a transfer, if the total is known.
#[must_use]
pub fn percent(received: u64, total: Option<u64>) -> Option<u8> {
    let total = total.filter(|&t| t > 0)?;
    let pct = received.saturating_mul(100) / total;
    Some(u8::try_from(pct.min(100)).unwrap_or(100))
}

/// Tracks the in-flight transfer and drives a [`TransferProgress`] view.
pub struct ProgressReporter {
    view: Arc<dyn TransferProgress>,
    session: Mutex<Option<DownloadSession>>,
    in_flight: watch::Sender<bool>,
}

impl ProgressReporter {
    /// Creates a reporter rendering to `view`.
    #[must_use]
    pub fn new(view: Arc<dyn TransferProgress>) -> Self {
        let (in_flight, _) = watch::channel(false);
        Self {
            view,
            session: Mutex::new(None),
            in_flight,
        }
    }

    fn session(&self) -> MutexGuard<'_, Option<DownloadSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts a new session and marks a transfer as in flight.
    pub fn begin(&self, url: &str, target: Option<PathBuf>) {
        self.in_flight.send_replace(true);
        let mut session = self.session();
        *session = Some(DownloadSession {
            url: url.to_string(),
            target,
            last_percent: 0,
        });
        self.view.on_start(url);
    }

    /// Redraws the percentage if it changed and the transfer is not nearly done.
    pub fn update(&self, percent: u8) {
        let mut session = self.session();
        let Some(current) = session.as_mut() else {
            return;
        };
        if percent == current.last_percent || percent >= NEAR_COMPLETE {
            return;
        }
        current.last_percent = percent;
        self.view.on_progress(percent);
    }

    /// Ends the current session, erases the indicator and signals completion.
    ///
    /// Returns the finished session, if one was running.
    pub fn end(&self) -> Option<DownloadSession> {
        let finished = {
            let mut session = self.session();
            self.view.on_end();
            session.take()
        };
        self.in_flight.send_replace(false);
        finished
    }

    /// Prints a status line without interleaving with the indicator.
    pub fn println(&self, msg: &str) {
        let _session = self.session();
        self.view.on_message(msg);
    }

    /// Returns true while a transfer is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        *self.in_flight.borrow()
    }

    /// Waits until the in-flight transfer has signalled its end.
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        let _ = rx.wait_for(|busy| !busy).await;
    }
}
