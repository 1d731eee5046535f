mod dirs;
mod settings;
mod validation;

pub use dirs::Directories;
pub use settings::{
    AuthConfig, AuthMethod, Config, ConnectionConfig, DEFAULT_DRIVER_PATH, DEFAULT_PASSWORD_ENV,
    DEFAULT_REGISTRY_PATH, DriverConfig, MotionConfig,
};
pub use validation::warn_unknown_fields;
