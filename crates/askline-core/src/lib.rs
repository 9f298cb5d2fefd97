pub mod config;
pub mod error;
pub mod types;

pub use config::AsklineConfig;
pub use error::{AsklineError, Result};
pub use types::*;
