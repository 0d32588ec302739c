pub mod config;
pub mod error;
pub mod models;

pub use config::{ApiConfig, AppConfig, ListConfig};
pub use error::{ExitCode, QuotedeckError, Result};
pub use models::*;
