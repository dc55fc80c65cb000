//! Tracing subscriber setup.
//!
//! Library code only emits through `tracing`; binaries and tests decide
//! where it goes by calling [`init_tracing`] once.

use crate::config::LogSettings;
use crate::errors::SettingsError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the filter: `RUST_LOG` when set, otherwise `settings.level`.
///
/// # Errors
///
/// Returns an error if `settings.level` is not a valid filter directive.
pub fn env_filter(settings: &LogSettings) -> Result<EnvFilter, SettingsError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| SettingsError::invalid("log.level", e.to_string()))
}

/// Installs the global subscriber, human readable or JSON lines.
///
/// A subscriber that is already installed is left in place.
///
/// # Errors
///
/// Returns an error if the level directive is invalid.
pub fn init_tracing(settings: &LogSettings) -> Result<(), SettingsError> {
    let filter = env_filter(settings)?;

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(settings.json.then(|| fmt::layer().json().with_current_span(true)))
        .with((!settings.json).then(|| fmt::layer().with_target(true)))
        .try_init();

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let settings = LogSettings {
            level: "contentflow=notalevel".to_string(),
            json: false,
        };
        assert!(env_filter(&settings).is_err());
    }

    #[test]
    fn test_init_twice_is_ok() {
        let settings = LogSettings::default();
        assert!(init_tracing(&settings).is_ok());
        assert!(init_tracing(&LogSettings { json: true, ..settings }).is_ok());
    }
}
