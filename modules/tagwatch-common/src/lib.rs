pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::TagwatchError;
pub use types::{MonitorConfig, PostRecord};
