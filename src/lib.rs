//! Packet capture and analysis core: layered dissection, capture batching,
//! conversation tracking and display filtering.

pub mod app;
pub mod capture;
pub mod config;
pub mod conversation;
pub mod dissect;
pub mod error;
pub mod event;
pub mod filter;
pub mod store;

pub use app::Session;
pub use error::{CaptureError, FilterError};
pub use filter::FilterExpression;
