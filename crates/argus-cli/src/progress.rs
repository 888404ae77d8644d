//! Progress bar per username, kept out of the way of log lines.

use argus_core::ProbeJob;
use argus_scanner::{ScanObserver, Verdict};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

const TEMPLATE: &str = "{msg} [{bar:40.green}] {pos}/{len} ({elapsed})";

/// Log writer that hides active progress bars while a line is printed.
#[derive(Clone)]
pub struct LogWriter {
    bars: MultiProgress,
}

impl LogWriter {
    pub fn new(bars: MultiProgress) -> Self {
        Self { bars }
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = SuspendingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendingWriter {
            bars: self.bars.clone(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one log event and prints it with the bars suspended.
pub struct SuspendingWriter {
    bars: MultiProgress,
    buf: Vec<u8>,
}

impl Write for SuspendingWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SuspendingWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        self.bars.suspend(|| {
            let _ = io::stderr().write_all(&buf);
        });
    }
}

/// [`ScanObserver`] drawing one bar per username.
pub struct ProgressObserver {
    bars: MultiProgress,
    current: Mutex<Option<ProgressBar>>,
}

impl ProgressObserver {
    pub fn new(bars: MultiProgress) -> Self {
        Self {
            bars,
            current: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = current.as_ref() {
            f(bar);
        }
    }
}

impl ScanObserver for ProgressObserver {
    fn on_username_start(&self, username: &str, index: usize, total: usize, jobs: usize) {
        let style = ProgressStyle::with_template(TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▒ ");
        let bar = self.bars.add(ProgressBar::new(jobs as u64));
        bar.set_style(style);
        bar.set_message(format!("[{}/{}] Searching '{}'", index + 1, total, username));

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Some(bar);
    }

    fn on_job_complete(&self, _job: &ProbeJob, _verdict: &Verdict) {
        self.with_bar(|bar| bar.inc(1));
    }

    fn on_username_complete(&self, _username: &str, _findings: usize) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = current.take() {
            bar.finish_and_clear();
            self.bars.remove(&bar);
        }
    }
}
