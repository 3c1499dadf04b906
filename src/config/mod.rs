// Configuration management module
// TOML settings plus credentials from the environment

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{Config, ConfigError, ProviderConfig, ProviderKind};

/// Load variables from a `.env` file in the working directory, if there is one
#[inline]
pub fn load_env_file() {
    match dotenv::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!("Failed to load .env file: {}", e),
    }
}
