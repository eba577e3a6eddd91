//! Configuration loader and path helpers.
//!
//! Figment merges `config.toml`, then `config.<env>.toml` selected by
//! `RUST_ENV`, then `APP_*` environment variables (`__` separates
//! sections, e.g. `APP_RETRIEVAL__TOP_K=10`). Typed sections are pulled
//! with [`Config::get`] or [`Config::get_or`].

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load from the default file chain in the working directory.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load from an explicit TOML file instead of the default chain.
    /// Environment overrides apply in both cases.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        match path {
            Some(p) => {
                if !p.is_file() {
                    return Err(Error::InvalidConfig(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                figment = figment.merge(Toml::file(p));
            }
            None => {
                figment = figment.merge(Toml::file("config.toml"));
                let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
                let env_file = match env_name.as_str() {
                    "dev" | "development" => Some("config.dev.toml"),
                    "prod" | "production" => Some("config.prod.toml"),
                    "test" | "testing" => Some("config.test.toml"),
                    _ => None,
                };
                if let Some(file) = env_file {
                    figment = figment.merge(Toml::file(file));
                }
            }
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    /// Extract a typed value at `key`. Missing or malformed values are
    /// configuration errors.
    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("'{key}': {e}")))
    }

    /// Extract a typed section, falling back to its `Default` when the
    /// section is absent or incomplete.
    pub fn get_or<T>(&self, key: &str) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        self.figment.extract_inner(key).unwrap_or_default()
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
