//! Build context - filesystem layout and the prepared process environment.
//!
//! The build tree is the sole communication channel between stages:
//!
//! ```text
//! <project>/build/dev/src        dev-stage sources
//! <project>/build/dev/install    dev-stage install space
//! <project>/build/mcu/src        mcu-stage sources
//! <project>/build/mcu/install    mcu-stage install space (archives + headers)
//! <project>/build/aux            archive-merge staging area
//! <project>/libmicroros/         final artifact (library + include tree)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::catalog::Distro;
use crate::util::fs::ensure_dir;
use crate::util::hash::short_hash;

/// Final library file name.
pub const LIBRARY_NAME: &str = "libmicroros.a";

/// Windows path length beyond which tools like ninja start failing, so the
/// build tree is relocated to a short temp folder.
const LONG_PATH_LIMIT: usize = 200;

/// Build context for one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildContext {
    project_dir: PathBuf,
    build_dir: PathBuf,
    distro: Distro,
    env: BTreeMap<String, String>,
}

impl BuildContext {
    /// Create a build context rooted at `project_dir`.
    pub fn new(project_dir: &Path, distro: Distro) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .with_context(|| format!("project directory not found: {}", project_dir.display()))?;

        let build_dir = resolve_build_dir(&project_dir);
        let mut env = prepare_environment(std::env::vars().collect());

        // Redirect Python bytecode caching out of deeply nested install
        // paths. This is a robustness nicety, not correctness-critical.
        if let Err(err) = setup_python_cache(&build_dir, &mut env) {
            tracing::warn!("could not set up bytecode cache redirection: {}", err);
        }

        Ok(BuildContext {
            project_dir,
            build_dir,
            distro,
            env,
        })
    }

    /// Get the project root.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Get the build tree root.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Get the target distro.
    pub fn distro(&self) -> Distro {
        self.distro
    }

    /// Environment passed to every collaborator process.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Dev-stage workspace root.
    pub fn dev_dir(&self) -> PathBuf {
        self.build_dir.join("dev")
    }

    /// Dev-stage source tree.
    pub fn dev_src_dir(&self) -> PathBuf {
        self.dev_dir().join("src")
    }

    /// Dev-stage install space.
    pub fn dev_install_dir(&self) -> PathBuf {
        self.dev_dir().join("install")
    }

    /// Mcu-stage workspace root.
    pub fn mcu_dir(&self) -> PathBuf {
        self.build_dir.join("mcu")
    }

    /// Mcu-stage source tree.
    pub fn mcu_src_dir(&self) -> PathBuf {
        self.mcu_dir().join("src")
    }

    /// Mcu-stage install space.
    pub fn mcu_install_dir(&self) -> PathBuf {
        self.mcu_dir().join("install")
    }

    /// Staging area for the archive merge.
    pub fn staging_dir(&self) -> PathBuf {
        self.build_dir.join("aux")
    }

    /// Final artifact directory.
    pub fn library_dir(&self) -> PathBuf {
        self.project_dir.join("libmicroros")
    }

    /// Final merged library path.
    pub fn library_path(&self) -> PathBuf {
        self.library_dir().join(LIBRARY_NAME)
    }

    /// Final include tree.
    pub fn include_dir(&self) -> PathBuf {
        self.library_dir().join("include")
    }
}

/// Pick the build tree location. On Windows, deeply nested project paths
/// (OneDrive and friends) break ninja and CMake, so a long default path
/// moves the tree to a short hashed folder under the temp directory.
fn resolve_build_dir(project_dir: &Path) -> PathBuf {
    let default = project_dir.join("build");

    if cfg!(windows) && default.as_os_str().len() > LONG_PATH_LIMIT {
        let short = std::env::temp_dir().join(format!(
            "microros_build_{}",
            short_hash(&project_dir.display().to_string())
        ));
        tracing::info!(
            "using short build folder {} to avoid long path issues",
            short.display()
        );
        return short;
    }

    default
}

/// Scrub a conflicting host ROS environment from the given variables.
///
/// Pure over its input so the policy is testable in isolation:
/// - an active distro's bin directory is removed from `PATH`;
/// - `AMENT_PREFIX_PATH` is dropped so host packages never leak into the
///   cross-compiled workspace;
/// - `RMW_IMPLEMENTATION` is forced to the embedded middleware when set.
pub fn prepare_environment(mut vars: BTreeMap<String, String>) -> BTreeMap<String, String> {
    if let Some(ros_distro) = vars.get("ROS_DISTRO").cloned() {
        if let Some(path) = vars.get_mut("PATH") {
            *path = path.replace(&format!("/opt/ros/{}/bin:", ros_distro), "");
        }
        vars.remove("AMENT_PREFIX_PATH");
    }

    if vars.contains_key("RMW_IMPLEMENTATION") {
        vars.insert(
            "RMW_IMPLEMENTATION".to_string(),
            "rmw_microxrcedds".to_string(),
        );
    }

    vars
}

/// Point Python at a build-local bytecode cache.
fn setup_python_cache(build_dir: &Path, env: &mut BTreeMap<String, String>) -> Result<()> {
    let pycache_dir = build_dir.join("pycache");
    ensure_dir(&pycache_dir)?;

    env.insert(
        "PYTHONPYCACHEPREFIX".to_string(),
        pycache_dir.display().to_string(),
    );
    env.insert("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let tmp = TempDir::new().unwrap();
        let ctx = BuildContext::new(tmp.path(), Distro::Humble).unwrap();

        assert_eq!(ctx.dev_src_dir(), ctx.build_dir().join("dev/src"));
        assert_eq!(ctx.mcu_install_dir(), ctx.build_dir().join("mcu/install"));
        assert_eq!(ctx.staging_dir(), ctx.build_dir().join("aux"));
        assert!(ctx.library_path().ends_with("libmicroros/libmicroros.a"));
        assert!(ctx.include_dir().ends_with("libmicroros/include"));
    }

    #[test]
    fn test_prepare_environment_scrubs_ros() {
        let mut vars = BTreeMap::new();
        vars.insert("ROS_DISTRO".to_string(), "humble".to_string());
        vars.insert(
            "PATH".to_string(),
            "/opt/ros/humble/bin:/usr/bin:/bin".to_string(),
        );
        vars.insert("AMENT_PREFIX_PATH".to_string(), "/opt/ros/humble".to_string());

        let prepared = prepare_environment(vars);

        assert_eq!(prepared["PATH"], "/usr/bin:/bin");
        assert!(!prepared.contains_key("AMENT_PREFIX_PATH"));
    }

    #[test]
    fn test_prepare_environment_forces_embedded_rmw() {
        let mut vars = BTreeMap::new();
        vars.insert(
            "RMW_IMPLEMENTATION".to_string(),
            "rmw_fastrtps_cpp".to_string(),
        );

        let prepared = prepare_environment(vars);
        assert_eq!(prepared["RMW_IMPLEMENTATION"], "rmw_microxrcedds");
    }

    #[test]
    fn test_prepare_environment_leaves_clean_env_alone() {
        let mut vars = BTreeMap::new();
        vars.insert("PATH".to_string(), "/usr/bin:/bin".to_string());

        let prepared = prepare_environment(vars.clone());
        assert_eq!(prepared, vars);
    }

    #[test]
    fn test_python_cache_redirection() {
        let tmp = TempDir::new().unwrap();
        let ctx = BuildContext::new(tmp.path(), Distro::Jazzy).unwrap();

        assert_eq!(ctx.env()["PYTHONDONTWRITEBYTECODE"], "1");
        assert!(ctx.env()["PYTHONPYCACHEPREFIX"].contains("pycache"));
        assert!(ctx.build_dir().join("pycache").exists());
    }
}
