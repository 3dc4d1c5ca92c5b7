pub mod config;
pub mod error;
pub mod network;
pub mod telemetry;

pub use config::Settings;
pub use error::AppError;
pub use network::{Currency, NetworkKind, NetworkProfile, NetworkRegistry};
