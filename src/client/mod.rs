//! Review API and Telegram clients plus the loop that connects them
//!
//! `api` and `telegram` talk HTTP, `service` runs a single poll-parse-notify
//! pass, and `poller` repeats it on a schedule.

pub mod api;
pub mod config;
pub mod error;
pub mod poller;
pub mod service;
pub mod telegram;

// Re-export main types for convenience
pub use api::{HomeworkSource, ReviewApi};
pub use config::{ClientConfig, PollingConfig};
pub use error::{ClientError, ErrorKind, Result};
pub use poller::{HomeworkPoller, PollState};
pub use service::{HomeworkService, Iteration, Outcome};
pub use telegram::TelegramApi;
