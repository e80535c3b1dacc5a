//! gotosleep -- schedule, track and cancel a one-shot OS shutdown from the
//! terminal.
//!
//! The crate holds the duration parser, the job lifecycle, the per-OS
//! shutdown executors, the persisted state document, and the terminal UI
//! that drives them.

pub mod app;
pub mod config;
pub mod duration;
pub mod i18n;
pub mod logging;
pub mod scheduler;
pub mod shutdown;
pub mod storage;
pub mod tui;
pub mod ui;
