//! Polls the homework review API and relays status changes to a Telegram chat.

pub mod app_init;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod id;
pub mod logging;
pub mod notice;
pub mod result;
