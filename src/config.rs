//! Compiler configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `wix_location`
pub const WIX_LOCATION_ENV: &str = "WIX_TREE_WIXDIR";

/// Kind of package the document describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    #[default]
    Msi,
    Msm,
}

impl OutputType {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputType::Msi => "msi",
            OutputType::Msm => "msm",
        }
    }
}

/// Per-compiler options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    /// Id given to the auto-detected installation directory. Empty disables
    /// the auto-assignment.
    #[serde(default = "default_install_dir_id")]
    pub install_dir_default_id: String,

    /// Rewrite 32-bit special folders to their 64-bit forms for x64 packages
    #[serde(default = "default_true")]
    pub map_64_install_dirs: bool,

    /// Keep intermediate files after the build
    #[serde(default)]
    pub preserve_temp_files: bool,

    /// Accept a license file that is not RTF
    #[serde(default)]
    pub allow_non_rtf_license: bool,

    #[serde(default)]
    pub output_type: OutputType,

    /// Extra arguments for the compile stage
    #[serde(default = "default_candle_options")]
    pub candle_options: String,

    /// Extra arguments for the link stage
    #[serde(default = "default_light_options")]
    pub light_options: String,

    /// Directory holding the toolchain binaries
    #[serde(default)]
    pub wix_location: Option<PathBuf>,
}

fn default_install_dir_id() -> String {
    "INSTALLDIR".to_string()
}

fn default_true() -> bool {
    true
}

fn default_candle_options() -> String {
    "-sw1026".to_string()
}

fn default_light_options() -> String {
    "-sw1076 -sw1079".to_string()
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            install_dir_default_id: default_install_dir_id(),
            map_64_install_dirs: true,
            preserve_temp_files: false,
            allow_non_rtf_license: false,
            output_type: OutputType::Msi,
            candle_options: default_candle_options(),
            light_options: default_light_options(),
            wix_location: None,
        }
    }
}

impl CompilerOptions {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Find and load config from standard locations
    pub fn find_and_load(start_dir: &Path) -> Option<Self> {
        let config_names = [".wixtreerc.json", "wixtree.json"];

        let mut current = Some(start_dir);
        while let Some(dir) = current {
            for name in &config_names {
                let config_path = dir.join(name);
                if config_path.exists() {
                    if let Ok(config) = Self::load(&config_path) {
                        return Some(config);
                    }
                }
            }
            current = dir.parent();
        }

        None
    }

    /// Toolchain directory, the environment override winning over the file
    pub fn resolved_wix_location(&self) -> Option<PathBuf> {
        match std::env::var_os(WIX_LOCATION_ENV) {
            Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
            _ => self.wix_location.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
