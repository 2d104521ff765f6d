pub mod settings;

pub use settings::{AppConfig, HealthConfig, ServerConfig};
