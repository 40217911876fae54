//! Tracing setup: console, rolling JSON file, and forwarding of error records
//! to the chat

use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::Local;
use compact_str::{CompactString, format_compact};
use tokio::sync::{mpsc, oneshot};
use tracing::{
    Event, Level, Subscriber, debug,
    field::{Field, Visit},
    warn,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, layer::Context, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
    dispatcher::Dispatcher,
    result::{BotError, Result},
};

const LOG_FILE_PREFIX: &str = "homework-notifier.log";
pub const DEFAULT_MAX_LOG_FILES: usize = 5;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directive used when `RUST_LOG` is not set
    pub level: CompactString,
    /// Directory for the daily-rolling JSON log, `None` disables file logging
    pub log_dir: Option<PathBuf>,
    /// Rolled files kept in `log_dir`, older ones are deleted
    pub max_log_files: usize,
}

impl LoggingConfig {
    pub fn new(level: impl Into<CompactString>, log_dir: Option<PathBuf>) -> Self {
        Self { level: level.into(), log_dir, max_log_files: DEFAULT_MAX_LOG_FILES }
    }

    pub fn with_max_log_files(mut self, max_log_files: usize) -> Self {
        self.max_log_files = max_log_files;
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.level.as_str()))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber.
///
/// When `forward_to` is given, every `ERROR` record is also formatted and sent
/// over the channel; see [`spawn_error_forwarder`].
pub fn init_logging(
    config: &LoggingConfig,
    forward_to: Option<mpsc::UnboundedSender<Forwarded>>,
) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = file_appender(dir, config.max_log_files)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .with(forward_to.map(ErrorForwardLayer::new))
        .try_init()
        .map_err(|e| BotError::logging_init(e.to_string()))?;

    Ok(guard)
}

/// Daily-rolling appender keeping at most `max_files` files in `dir`
fn file_appender(dir: &Path, max_files: usize) -> Result<RollingFileAppender> {
    std::fs::create_dir_all(dir)
        .map_err(|e| BotError::logging_init(format!("cannot create {}: {e}", dir.display())))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .max_log_files(max_files.max(1))
        .build(dir)
        .map_err(|e| BotError::logging_init(format!("cannot log to {}: {e}", dir.display())))
}

/// Item travelling from [`ErrorForwardLayer`] to the forwarder task
#[derive(Debug)]
pub enum Forwarded {
    Record(CompactString),
    /// Answered once every record queued before it has been dispatched
    Flush(oneshot::Sender<()>),
}

/// Handle to the task posting forwarded error records
#[derive(Debug)]
pub struct ErrorForwarder {
    sender: mpsc::UnboundedSender<Forwarded>,
    flush_timeout: Duration,
}

impl ErrorForwarder {
    /// Wait until records queued so far are dispatched, giving up after the
    /// flush timeout. Returns whether the queue drained in time.
    pub async fn flush(&self) -> bool {
        let (done_tx, done_rx) = oneshot::channel();
        if self.sender.send(Forwarded::Flush(done_tx)).is_err() {
            return false;
        }
        matches!(tokio::time::timeout(self.flush_timeout, done_rx).await, Ok(Ok(())))
    }
}

/// Drain forwarded error records and post each one through `dispatcher`.
///
/// `sender` must feed `records`; the returned handle uses it to queue flush
/// markers. Delivery failures are logged at `warn` so they never loop back
/// into the forwarder.
pub fn spawn_error_forwarder(
    sender: mpsc::UnboundedSender<Forwarded>,
    mut records: mpsc::UnboundedReceiver<Forwarded>,
    dispatcher: Arc<dyn Dispatcher>,
    flush_timeout: Duration,
) -> ErrorForwarder {
    tokio::spawn(async move {
        debug!("Error forwarder started");
        while let Some(item) = records.recv().await {
            match item {
                Forwarded::Record(record) => {
                    if let Err(e) = dispatcher.dispatch(&record).await {
                        warn!(kind = %e.kind(), error = %e, "Failed to forward error record");
                    }
                },
                Forwarded::Flush(done) => {
                    let _ = done.send(());
                },
            }
        }
        debug!("Error forwarder stopped");
    });

    ErrorForwarder { sender, flush_timeout }
}

/// Layer sending a formatted copy of every `ERROR` event to a channel
#[derive(Debug, Clone)]
pub struct ErrorForwardLayer {
    sender: mpsc::UnboundedSender<Forwarded>,
}

impl ErrorForwardLayer {
    pub fn new(sender: mpsc::UnboundedSender<Forwarded>) -> Self {
        Self { sender }
    }
}

impl<S: Subscriber> Layer<S> for ErrorForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() != Level::ERROR {
            return;
        }

        let mut visitor = RecordVisitor::default();
        event.record(&mut visitor);

        let mut record = format_compact!(
            "Time: {}\nLevel: {}\nIn: {}\n{}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            metadata.level(),
            metadata.target(),
            visitor.message
        );
        if !visitor.fields.is_empty() {
            record.push('\n');
            record.push_str(&visitor.fields);
        }

        // receiver gone means the forwarder was shut down
        let _ = self.sender.send(Forwarded::Record(record));
    }
}

#[derive(Default)]
struct RecordVisitor {
    message: CompactString,
    fields: CompactString,
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field, format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field, format_args!("{value:?}"));
        }
    }
}

impl RecordVisitor {
    fn push_field(&mut self, field: &Field, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push('\n');
        }
        let _ = write!(self.fields, "{}: {}", field.name(), value);
    }
}

/// Subscriber that only captures formatted error records, for assertions
#[cfg(test)]
pub(crate) fn capture_errors() -> (impl Subscriber + Send + Sync, CapturedErrors) {
    let (tx, rx) = mpsc::unbounded_channel();
    let subscriber = tracing_subscriber::registry().with(ErrorForwardLayer::new(tx));
    (subscriber, CapturedErrors(rx))
}

#[cfg(test)]
pub(crate) struct CapturedErrors(mpsc::UnboundedReceiver<Forwarded>);

#[cfg(test)]
impl CapturedErrors {
    pub(crate) fn try_recv(&mut self) -> std::result::Result<CompactString, &'static str> {
        match self.0.try_recv() {
            Ok(Forwarded::Record(record)) => Ok(record),
            Ok(Forwarded::Flush(_)) => Err("unexpected flush marker"),
            Err(_) => Err("no error record"),
        }
    }
}
