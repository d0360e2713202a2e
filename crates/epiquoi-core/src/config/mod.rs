//! Client configuration
//!
//! Sources are merged in order: built-in defaults, an optional config file
//! (JSON, TOML or YAML), `EPIQUOI_*` environment variables, then values from
//! the command line.

pub mod loader;
pub mod model;
pub mod timeouts;

pub use loader::{ConfigLoader, ConfigOverrides, ConfigSource, default_config_path, load_from_file};
pub use model::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MAX_MESSAGE_CHARS};
