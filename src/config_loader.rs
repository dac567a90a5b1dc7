use crate::config::Settings;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::fs::File;
use std::path::Path;

/// Environment variable naming an optional YAML settings file.
pub const SETTINGS_ENV: &str = "SWITCHNET_CONFIG";

/// Load and validate settings from a YAML file
pub fn load_settings(path: &Path) -> Result<Settings> {
    info!("Loading settings from: {:?}", path);

    let file = File::open(path)
        .wrap_err_with(|| format!("Failed to open settings file '{}'", path.display()))?;

    let settings: Settings = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse settings file '{}'", path.display()))?;

    settings.validate()?;

    Ok(settings)
}

/// Load settings from the file named by `SWITCHNET_CONFIG`, or fall back to
/// the defaults when the variable is unset or empty.
pub fn load_settings_from_env() -> Result<Settings> {
    match std::env::var_os(SETTINGS_ENV) {
        Some(path) if !path.is_empty() => load_settings(Path::new(&path)),
        _ => {
            debug!("{} not set, using default settings", SETTINGS_ENV);
            Ok(Settings::default())
        }
    }
}

/// Render settings as YAML, for the debug log
pub fn settings_to_yaml(settings: &Settings) -> Result<String> {
    Ok(serde_yaml::to_string(settings)?)
}
