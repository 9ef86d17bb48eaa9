//! Shared fixtures and helpers for snapshot lifecycle BDD scenarios.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use rstest::fixture;
use snapwarden::test_support::{FixedClock, RecordingProvider};
use snapwarden::{RunSettings, RunSummary, SnapshotManager};
use tracing_subscriber::fmt::MakeWriter;

use crate::fixtures;

/// Log sink shared between the subscriber and the assertions.
#[derive(Clone, Debug, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|err| io::Error::other(err.to_string()))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[derive(Clone, Debug)]
pub struct LifecycleContext {
    pub provider: RecordingProvider,
    pub clock: FixedClock,
    pub settings: Rc<RefCell<RunSettings>>,
    pub summary: Rc<RefCell<Option<RunSummary>>>,
    pub logs: LogBuffer,
}

#[fixture]
pub fn lifecycle_context() -> LifecycleContext {
    LifecycleContext {
        provider: RecordingProvider::new(),
        clock: fixtures::clock(),
        settings: Rc::new(RefCell::new(RunSettings::default())),
        summary: Rc::new(RefCell::new(None)),
        logs: LogBuffer::default(),
    }
}

/// Runs both phases with a subscriber that writes into the context's log
/// buffer, and stores the summary.
pub fn run_with_captured_logs(context: &LifecycleContext) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(context.logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let manager = SnapshotManager::with_clock(
        context.provider.clone(),
        context.settings.borrow().clone(),
        context.clock,
    );
    let summary = tracing::subscriber::with_default(subscriber, || manager.run());
    context.summary.replace(Some(summary));
}
