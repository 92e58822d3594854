//! HTTP capability and per-target session state

pub mod client;
pub mod session;
pub use client::HttpClient;
pub use session::{Page, SessionState};
