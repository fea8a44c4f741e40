mod log;
mod mediator;
mod server;

pub use log::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use mediator::{GatewayConfig, MediatorConfig};
pub use server::ServerConfig;

pub const HCX_PREFIX: &str = "HCX";
pub const DEFAULT_CONFIG_FILE_PATH: &str = "hcx-mediator.toml";
