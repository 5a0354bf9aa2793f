use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use searchbar_core::Settings;

pub const PROGNAME: &str = "searchbar";
pub const CONFIG_NAME: &str = "config.toml";
pub const LOG_NAME: &str = "searchbar.log";

/// Reads the settings from `path`, or from the default config file.
///
/// A missing default file just means defaults. A file that was asked for
/// explicitly has to exist.
pub fn read_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let conf_file = match path {
        Some(p) => p.to_path_buf(),
        None => conf_dir()?.join(CONFIG_NAME),
    };

    match fs::read_to_string(&conf_file) {
        Ok(conts) => parse_settings(&conts)
            .with_context(|| format!("reading config file at {:?}", conf_file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound && path.is_none() => {
            log::info!("There is no config file at {:?}, using defaults", conf_file);
            Ok(Settings::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading config file at {:?}", conf_file)),
    }
}

pub fn parse_settings(conts: &str) -> anyhow::Result<Settings> {
    let settings: Settings = toml::from_str(conts).context("parsing config file as TOML")?;
    validate(&settings)?;
    Ok(settings)
}

pub fn validate(settings: &Settings) -> anyhow::Result<()> {
    if settings.endpoint.trim().is_empty() {
        anyhow::bail!("The endpoint must not be empty");
    }
    if settings.query_param.is_empty() || settings.results_key.is_empty() {
        anyhow::bail!("The query parameter and results key must not be empty");
    }
    if settings.quiet_period_ms == 0 {
        log::warn!("A quiet period of 0ms sends a request for every keystroke");
    }
    Ok(())
}

pub fn conf_dir() -> anyhow::Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(PROGNAME))
        .context("could not get config dir")
}

pub fn cache_dir() -> anyhow::Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(PROGNAME))
        .context("could not get cache dir")
}
