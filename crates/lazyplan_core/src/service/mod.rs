//! Use-case facade over the engine.
//!
//! # Responsibility
//! - Expose the Today board operations to UI and CLI layers.
//! - Keep remote-store details behind the `RemoteStore` seam.

pub mod today_service;

pub use today_service::{DropOutcome, RefreshReport, TodayService, TodayServiceError};
