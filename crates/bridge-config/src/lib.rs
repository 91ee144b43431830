pub mod config;
pub mod desktop_client;
pub mod general;
pub mod logging;
pub mod mobile_client;
pub mod store;
pub mod transformation_engine;

pub use config::Config;
pub use desktop_client::DesktopClientConfig;
pub use general::GeneralConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use mobile_client::MobileClientConfig;
pub use store::{ConfigStore, ConfigView};
pub use transformation_engine::TransformationEngineConfig;
