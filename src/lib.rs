//! webprobe - CSRF, reflected XSS and SQL injection probe engine
//!
//! Drives a target web application through a fixed suite of CSRF checks and
//! two payload sweeps, then folds everything into a single JSON-serializable
//! report keyed by category.

pub mod config;
pub mod error;
pub mod extractor;
pub mod http;
pub mod models;
pub mod report;
pub mod scanner;

pub use error::{ProbeError, Result};
pub use models::{Category, ProbeConfig, Target};
pub use report::Report;
pub use scanner::{run_probes, ProbeEngine};
