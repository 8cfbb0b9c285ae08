//! # assist-settings
//!
//! Layered configuration for the assist chat client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`AssistSettings::default()`]
//! 2. **User file**: `~/.assist/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `ASSIST_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<AssistSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.assist/settings.json` with env var
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> &'static AssistSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Initialize the global settings with a specific value.
///
/// Returns `Err(settings)` if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: AssistSettings) -> std::result::Result<(), AssistSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = AssistSettings::default();
        let path = settings_path();
        assert!(path.ends_with(".assist/settings.json"));
    }

    #[test]
    fn global_settings_initialize_once() {
        let first = get_settings();
        assert!(init_settings(AssistSettings::default()).is_err());
        assert!(std::ptr::eq(first, get_settings()));
    }
}
