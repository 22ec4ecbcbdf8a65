//! Persisted preference: the regex-tier switch.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("cannot read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed preferences {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot encode preferences: {0}")]
    Encode(#[from] toml::ser::Error),
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(rename = "enable_RegExp", default = "enabled_by_default")]
    pub enable_regexp: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            enable_regexp: enabled_by_default(),
        }
    }
}

pub trait PreferenceStore {
    fn regex_enabled(&self) -> bool;
    fn set_regex_enabled(&mut self, enabled: bool) -> Result<(), PrefsError>;
}

/// TOML-file backed preferences, written through on every change.
#[derive(Debug)]
pub struct TomlPreferences {
    path: PathBuf,
    prefs: Preferences,
}

impl TomlPreferences {
    /// A missing file reads as the defaults and is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PrefsError> {
        let path = path.into();
        let prefs = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str(&text).map_err(|source| PrefsError::Decode {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Preferences::default(),
            Err(source) => return Err(PrefsError::Read { path, source }),
        };
        Ok(Self { path, prefs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), PrefsError> {
        let text = toml::to_string(&self.prefs)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| PrefsError::Write {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, text).map_err(|source| PrefsError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl PreferenceStore for TomlPreferences {
    fn regex_enabled(&self) -> bool {
        self.prefs.enable_regexp
    }

    fn set_regex_enabled(&mut self, enabled: bool) -> Result<(), PrefsError> {
        self.prefs.enable_regexp = enabled;
        self.save()
    }
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    prefs: Preferences,
}

impl MemoryPreferences {
    pub fn new(regex_enabled: bool) -> Self {
        Self {
            prefs: Preferences {
                enable_regexp: regex_enabled,
            },
        }
    }
}

impl PreferenceStore for MemoryPreferences {
    fn regex_enabled(&self) -> bool {
        self.prefs.enable_regexp
    }

    fn set_regex_enabled(&mut self, enabled: bool) -> Result<(), PrefsError> {
        self.prefs.enable_regexp = enabled;
        Ok(())
    }
}
