use std::env::VarError;
use std::path::Path;

use secrecy::SecretString;

use crate::{Error, Result};

pub const GEMINI_API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";
pub const GEMINI_MODEL_ENV_VAR: &str = "GEMINI_MODEL";
pub const GEMINI_BASE_URL_ENV_VAR: &str = "GEMINI_BASE_URL";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Startup configuration shared by both front-ends.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: SecretString,
    pub model: String,
    pub base_url: String,
}

impl Config {
    /// Loads `.env` from the working directory (or a parent) when one exists,
    /// then reads the process environment.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err.into()),
        }
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Like [`Config::from_env`] but with an explicit environment file, which
    /// must exist.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        dotenvy::from_path(path)?;
        tracing::debug!(path = %path.display(), "loaded environment file");
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Builds the configuration from an arbitrary variable lookup. An unset or
    /// empty API key is a [`Error::MissingCredential`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> std::result::Result<String, VarError>,
    {
        let api_key = match optional(&lookup, GEMINI_API_KEY_ENV_VAR)? {
            Some(key) => SecretString::from(key),
            None => return Err(Error::MissingCredential(GEMINI_API_KEY_ENV_VAR.to_string())),
        };

        Ok(Self {
            api_key,
            model: optional(&lookup, GEMINI_MODEL_ENV_VAR)?
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: optional(&lookup, GEMINI_BASE_URL_ENV_VAR)?
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

fn optional<F>(lookup: &F, key: &str) -> Result<Option<String>>
where
    F: Fn(&str) -> std::result::Result<String, VarError>,
{
    match lookup(key) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(err) => Err(Error::EnvVarError(key.to_string(), err)),
    }
}
