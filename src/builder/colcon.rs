//! colcon adapter - invocation of the external build orchestrator.
//!
//! Both stages run colcon through a platform-selected shell so the Python
//! environment activation script and the dev-stage setup script can be
//! sourced in the same invocation. Exit code 0 is success; anything else
//! is fatal for the pipeline and the orchestrator's stderr is surfaced
//! verbatim.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use crate::builder::context::BuildContext;
use crate::builder::toolchain::CMakeToolchain;
use crate::core::catalog::Distro;
use crate::core::package::IGNORE_MARKER;
use crate::util::config::ColconConfig;
use crate::util::fs::{ensure_dir, write_string};
use crate::util::process::{find_colcon, ProcessBuilder};

/// Built-in per-package meta configuration shared by every target.
///
/// Trims the library down to what fits a microcontroller: no tracing, a
/// single typesupport, no command line or logging machinery in rcl, and a
/// static, allocation-averse rcutils.
pub fn common_meta() -> Value {
    json!({
        "names": {
            "tracetools": {
                "cmake-args": [
                    "-DTRACETOOLS_DISABLED=ON",
                    "-DTRACETOOLS_STATUS_CHECKING_TOOL=OFF"
                ]
            },
            "rosidl_typesupport": {
                "cmake-args": ["-DROSIDL_TYPESUPPORT_SINGLE_TYPESUPPORT=ON"]
            },
            "rcl": {
                "cmake-args": [
                    "-DBUILD_TESTING=OFF",
                    "-DRCL_COMMAND_LINE_ENABLED=OFF",
                    "-DRCL_LOGGING_ENABLED=OFF"
                ]
            },
            "rcutils": {
                "cmake-args": [
                    "-DENABLE_TESTING=OFF",
                    "-DRCUTILS_NO_FILESYSTEM=ON",
                    "-DRCUTILS_NO_THREAD_SUPPORT=ON",
                    "-DRCUTILS_NO_64_ATOMIC=ON",
                    "-DRCUTILS_AVOID_DYNAMIC_ALLOCATION=ON"
                ]
            },
            "microxrcedds_client": {
                "cmake-args": [
                    "-DUCLIENT_PIC=OFF",
                    "-DUCLIENT_PROFILE_UDP=OFF",
                    "-DUCLIENT_PROFILE_TCP=OFF",
                    "-DUCLIENT_PROFILE_DISCOVERY=OFF"
                ]
            },
            "rmw_microxrcedds": {
                "cmake-args": [
                    "-DRMW_UXRCE_MAX_NODES=1",
                    "-DRMW_UXRCE_MAX_PUBLISHERS=10",
                    "-DRMW_UXRCE_MAX_SUBSCRIPTIONS=5",
                    "-DRMW_UXRCE_MAX_SERVICES=1",
                    "-DRMW_UXRCE_MAX_CLIENTS=1",
                    "-DRMW_UXRCE_MAX_HISTORY=4"
                ]
            }
        }
    })
}

/// Deep-merge `overlay` into `base`: objects merge key-wise, everything
/// else (arrays included) is replaced by the override.
pub fn merge_meta(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_meta(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Write the merged meta configuration (common defaults + caller
/// overrides) into the mcu workspace and return its path.
pub fn write_merged_meta(ctx: &BuildContext, overrides: Option<&Value>) -> Result<PathBuf> {
    let mut meta = common_meta();
    if let Some(overrides) = overrides {
        merge_meta(&mut meta, overrides);
    }

    let path = ctx.mcu_dir().join("colcon.meta");
    let contents =
        serde_json::to_string_pretty(&meta).context("failed to serialize meta configuration")?;
    write_string(&path, &contents)?;

    Ok(path)
}

/// Build the host-side dev workspace.
pub fn build_dev(ctx: &BuildContext, python_env: Option<&Path>) -> Result<()> {
    check_colcon()?;
    suppress_dev_fixture(ctx)?;
    ensure_dir(&ctx.dev_dir())?;

    let mut parts = Vec::new();
    if let Some(script) = python_env {
        parts.push(activation_command(script));
    }
    parts.push(format!(
        "colcon build --cmake-args {}",
        dev_cmake_args().join(" ")
    ));

    run_stage("dev", &parts.join(" && "), &ctx.dev_dir(), ctx)
}

/// Build the cross-compiled mcu workspace.
pub fn build_mcu(
    ctx: &BuildContext,
    config: &ColconConfig,
    python_env: Option<&Path>,
    toolchain: &CMakeToolchain,
    merged_meta: &Path,
) -> Result<()> {
    check_colcon()?;
    ensure_dir(&ctx.mcu_dir())?;

    let mut metas = vec![merged_meta.display().to_string()];
    metas.extend(config.metas.iter().map(|p| p.display().to_string()));

    let mut cmake_args = mcu_cmake_args(toolchain);
    cmake_args.extend(config.cmake_args.iter().cloned());

    let mut parts = vec![dev_setup_command(ctx)];
    if let Some(script) = python_env {
        parts.push(activation_command(script));
    }
    parts.push(format!(
        "colcon build --merge-install --packages-ignore-regex=.*{} --metas {} --cmake-args {}",
        crate::core::package::BINDING_SUFFIX,
        metas.join(" "),
        cmake_args.join(" ")
    ));

    run_stage("mcu", &parts.join(" && "), &ctx.mcu_dir(), ctx)
}

/// The rolling/kilted dev workspace ships a test fixture package that does
/// not build in isolation; suppress it before the dev stage runs.
fn suppress_dev_fixture(ctx: &BuildContext) -> Result<()> {
    if !matches!(ctx.distro(), Distro::Rolling | Distro::Kilted) {
        return Ok(());
    }

    let fixture = ctx
        .dev_src_dir()
        .join("ament_cmake_ros/rmw_test_fixture_implementation");
    if fixture.exists() {
        write_string(&fixture.join(IGNORE_MARKER), "")?;
    }
    Ok(())
}

fn check_colcon() -> Result<()> {
    if find_colcon().is_none() {
        bail!(
            "colcon not found\n\
             \n\
             colcon is required to build the micro-ROS workspaces.\n\
             Install it (`pip install colcon-common-extensions`) and ensure\n\
             it's in your PATH."
        );
    }
    Ok(())
}

fn dev_cmake_args() -> Vec<String> {
    let mut args = Vec::new();
    if cfg!(windows) {
        args.push("-G".to_string());
        args.push("Ninja".to_string());
    }
    args.push("-DBUILD_TESTING=OFF".to_string());
    args
}

fn mcu_cmake_args(toolchain: &CMakeToolchain) -> Vec<String> {
    let mut args = Vec::new();
    if cfg!(windows) {
        args.push("-G".to_string());
        args.push("Ninja".to_string());
    }
    args.extend(
        [
            "-DCMAKE_POSITION_INDEPENDENT_CODE:BOOL=OFF",
            "-DTHIRDPARTY=ON",
            "-DBUILD_SHARED_LIBS=OFF",
            "-DBUILD_TESTING=OFF",
            "-DCMAKE_BUILD_TYPE=Release",
        ]
        .map(str::to_string),
    );
    args.push(format!(
        "-DCMAKE_TOOLCHAIN_FILE={}",
        toolchain.path().display()
    ));
    args
}

/// Command sourcing the Python environment activation script.
fn activation_command(script: &Path) -> String {
    if cfg!(windows) {
        // Virtualenvs keep the Windows activation script under Scripts/.
        let script = script
            .display()
            .to_string()
            .replace("/bin/activate", "/Scripts/activate.bat");
        format!("call \"{}\"", script)
    } else {
        format!(". {}", script.display())
    }
}

/// Command sourcing the dev-stage install space.
fn dev_setup_command(ctx: &BuildContext) -> String {
    if cfg!(windows) {
        format!(
            "call \"{}\"",
            ctx.dev_install_dir().join("setup.bat").display()
        )
    } else {
        format!(". {}", ctx.dev_install_dir().join("setup.sh").display())
    }
}

/// Build the platform shell invocation for a composite stage script.
fn shell_invocation(script: &str) -> ProcessBuilder {
    if cfg!(windows) {
        ProcessBuilder::new("cmd").arg("/C").arg(script)
    } else {
        ProcessBuilder::new("sh").arg("-c").arg(script)
    }
}

fn run_stage(stage: &str, script: &str, cwd: &Path, ctx: &BuildContext) -> Result<()> {
    tracing::debug!("{} stage: {}", stage, script);

    let output = shell_invocation(script)
        .cwd(cwd)
        .envs(ctx.env())
        .env_remove("AMENT_PREFIX_PATH")
        .exec()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("building {} workspace failed:\n{}", stage, stderr);
    }

    Ok(())
}
