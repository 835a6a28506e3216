//! Layered configuration.
//!
//! Values are merged, later sources winning:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. an optional TOML file (by default `config.toml` in the platform config
//!    directory, see [`default_config_file`]),
//! 3. environment variables prefixed with `GOP_`, e.g. `GOP_GO_BIN`,
//!    `GOP_WORKERS` or `GOP_EXCLUDE='[go@, toolchain@]'`.
//!
//! Command-line flags are applied on top by the binary.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use gop_archive::Compression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "GOP_";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the `go` binary; looked up on `PATH` when unset.
    pub go_bin: Option<PathBuf>,
    /// Path to the `jfrog` binary; looked up on `PATH` when unset.
    pub jfrog_bin: Option<PathBuf>,
    pub verbose: bool,
    /// Concurrent module downloads during transitive resolution.
    pub workers: usize,
    /// Concurrent files, modules or uploads while publishing.
    pub publish_workers: usize,
    /// Dependency-graph targets starting with any of these are never fetched.
    pub exclude: Vec<String>,
    #[serde(with = "compression")]
    pub compression: Compression,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            go_bin: None,
            jfrog_bin: None,
            verbose: false,
            workers: gop_asyncutils::DEFAULT_WORKERS,
            publish_workers: gop_asyncutils::DEFAULT_WORKERS,
            exclude: gop_module::DEFAULT_EXCLUDED.iter().map(|p| p.to_string()).collect(),
            compression: Compression::default(),
        }
    }
}

/// `config.toml` inside the platform-specific configuration directory.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "gop").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl Config {
    /// The merged provider stack, with `file` as the TOML layer.
    pub fn figment(file: Option<&Path>) -> Figment {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match file {
            Some(file) => figment.merge(Toml::file(file)),
            None => figment,
        };
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load from the default config file location and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_file().as_deref())
    }

    pub fn load_from(file: Option<&Path>) -> Result<Self> {
        if let Some(file) = file {
            tracing::trace!(path = %file.display(), exists = file.is_file(), "configuration file");
        }
        let config: Config = Self::figment(file).extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            exn::bail!(ErrorKind::Invalid("workers"));
        }
        if self.publish_workers == 0 {
            exn::bail!(ErrorKind::Invalid("publish_workers"));
        }
        Ok(())
    }
}

/// (De)serialize [`Compression`] through its short name.
mod compression {
    use gop_archive::Compression;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Compression, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_str())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Compression, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(|e: gop_archive::error::Error| D::Error::custom(&*e))
    }
}
