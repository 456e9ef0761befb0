use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AccountSettings, Config, DatabaseSettings, LogFormat, LoggingSettings, ServerSettings,
    StorageBackend, StorageSettings,
};

/// Loads the application configuration from `config.toml` in the working directory.
///
/// The file is optional. Environment variables prefixed with `FOLIO__` override
/// it, using `__` between nested keys (`FOLIO__SERVER__PORT=8080`).
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from("config.toml")
}

/// Same as [`load_config`] but reads the given file. A missing file is not an
/// error; every setting has a default.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    load(path.as_ref(), environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("FOLIO")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn load(path: &Path, env: config::Environment) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(env)
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
