//! Configuration file support.
//!
//! Project settings live in `microros.toml` at the project root:
//!
//! ```toml
//! [project]
//! distro = "humble"
//! extra_packages = "extra_packages"
//! python_env = ".venv/bin/activate"
//!
//! [toolchain]
//! cc = "/opt/xtensa/bin/xtensa-esp32-elf-gcc"
//! cxx = "/opt/xtensa/bin/xtensa-esp32-elf-g++"
//! ar = "/opt/xtensa/bin/xtensa-esp32-elf-ar"
//! cflags = ["-mlongcalls"]
//!
//! [colcon]
//! cmake_args = []
//! metas = ["app.meta"]
//! ```
//!
//! `[colcon.meta]` holds per-package overrides merged over the built-in
//! common meta configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "microros.toml";

/// microros-build configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project settings
    pub project: ProjectConfig,

    /// Cross-toolchain settings
    pub toolchain: ToolchainSettings,

    /// Extra arguments for the build orchestrator
    pub colcon: ColconConfig,
}

/// Project-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Target ROS 2 distro (e.g. "humble")
    pub distro: Option<String>,

    /// Folder with user-supplied extra packages and their `.repos` manifest,
    /// relative to the project root
    pub extra_packages: Option<PathBuf>,

    /// Activation script of the Python environment colcon runs in
    pub python_env: Option<PathBuf>,
}

/// Cross-toolchain settings written into the generated CMake toolchain file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the cross C compiler
    pub cc: Option<PathBuf>,

    /// Path to the cross C++ compiler
    pub cxx: Option<PathBuf>,

    /// Path to the cross archiver
    pub ar: Option<PathBuf>,

    /// Additional C compiler flags
    pub cflags: Vec<String>,

    /// Additional C++ compiler flags
    pub cxxflags: Vec<String>,
}

/// Settings forwarded to colcon invocations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColconConfig {
    /// Extra `--cmake-args` entries for the mcu stage
    pub cmake_args: Vec<String>,

    /// Additional meta file paths passed via `--metas`
    pub metas: Vec<PathBuf>,

    /// Per-package overrides merged over the built-in common meta
    pub meta: Option<serde_json::Value>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load the project configuration from `dir`, falling back to defaults
    /// when no config file exists.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
