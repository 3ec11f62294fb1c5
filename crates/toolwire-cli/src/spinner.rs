//! Braille spinner shown on stderr while a turn is waiting.

use std::io::{IsTerminal, Write};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const FRAME_MS: u64 = 80;

/// A spinner running as a background task until [`Spinner::stop`].
///
/// `show` sets the message and starts animating; `hide` pauses and clears
/// the line. Nothing is drawn when stderr is not a terminal.
pub struct Spinner {
    message: watch::Sender<Option<String>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    enabled: bool,
}

impl Spinner {
    pub fn start() -> Self {
        let enabled = std::io::stderr().is_terminal();
        let (message, rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(animate(rx, cancel.clone(), enabled));
        Self {
            message,
            cancel,
            handle,
            enabled,
        }
    }

    pub fn show(&self, message: impl Into<String>) {
        self.message.send_replace(Some(message.into()));
    }

    pub fn hide(&self) {
        self.message.send_replace(None);
        if self.enabled {
            clear_line();
        }
    }

    /// Stop the background task and clear the line.
    pub async fn stop(self) {
        self.message.send_replace(None);
        self.cancel.cancel();
        let _ = self.handle.await;
        if self.enabled {
            clear_line();
        }
    }
}

async fn animate(rx: watch::Receiver<Option<String>>, cancel: CancellationToken, enabled: bool) {
    let mut frame_idx = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_millis(FRAME_MS)) => {}
        }
        if !enabled {
            continue;
        }
        let current = rx.borrow().clone();
        if let Some(text) = current {
            let frame = FRAMES[frame_idx % FRAMES.len()];
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "\r\x1b[2K  {frame} {text}");
            let _ = err.flush();
            frame_idx += 1;
        }
    }
}

/// Clear the current spinner line on stderr.
pub fn clear_line() {
    let mut err = std::io::stderr().lock();
    let _ = write!(err, "\r\x1b[2K");
    let _ = err.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Spinner>();
    }

    #[tokio::test]
    async fn show_hide_and_stop() {
        let spinner = Spinner::start();
        spinner.show("Thinking...");
        tokio::time::sleep(Duration::from_millis(FRAME_MS * 2)).await;
        spinner.hide();
        spinner.show("Running sumar...");
        spinner.stop().await;
    }

    #[tokio::test]
    async fn stop_ends_the_task_promptly() {
        let spinner = Spinner::start();
        let stopped = tokio::time::timeout(Duration::from_secs(1), spinner.stop()).await;
        assert!(stopped.is_ok());
    }
}
