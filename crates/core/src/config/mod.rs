//! Configuration
//!
//! Loading, validation and the connection descriptor handed to the engine.

pub mod descriptor;
pub mod file;
pub mod validation;

pub use descriptor::*;
pub use file::{apply_env_overrides, load_config, DatabaseConfig, DEFAULT_CONFIG_PATH, PASSWORD_ENV_VAR};
pub use validation::*;
