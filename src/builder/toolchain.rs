//! CMake cross-toolchain file generation.
//!
//! The external orchestrator consumes a generated toolchain file selecting
//! the cross compilers and flags. The file is a static text artifact; the
//! forced `*_COMPILER_WORKS` settings skip CMake's try-compile probes,
//! which cannot link for a bare-metal target.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::ToolchainSettings;
use crate::util::fs::write_string;

/// A generated CMake toolchain file.
#[derive(Debug, Clone)]
pub struct CMakeToolchain {
    path: PathBuf,
}

impl CMakeToolchain {
    /// Render the toolchain file for `settings` and write it to `path`.
    pub fn generate(path: &Path, settings: &ToolchainSettings) -> Result<Self> {
        let cc = required(settings.cc.as_deref(), "cc")?;
        let cxx = required(settings.cxx.as_deref(), "cxx")?;
        let ar = required(settings.ar.as_deref(), "ar")?;

        let contents = format!(
            r#"include(CMakeForceCompiler)
set(CMAKE_SYSTEM_NAME Generic)

set(CMAKE_CROSSCOMPILING 1)
set(CMAKE_TRY_COMPILE_TARGET_TYPE STATIC_LIBRARY)

set(CMAKE_C_COMPILER_WORKS 1)
set(CMAKE_CXX_COMPILER_WORKS 1)

set(CMAKE_C_COMPILER {cc})
set(CMAKE_CXX_COMPILER {cxx})
set(CMAKE_AR {ar})

set(CMAKE_C_FLAGS_INIT "{cflags}" CACHE STRING "" FORCE)
set(CMAKE_CXX_FLAGS_INIT "{cxxflags}" CACHE STRING "" FORCE)

set(__BIG_ENDIAN__ 0)
"#,
            cc = cc.display(),
            cxx = cxx.display(),
            ar = ar.display(),
            cflags = settings.cflags.join(" "),
            cxxflags = settings.cxxflags.join(" "),
        );

        write_string(path, &contents)?;

        Ok(CMakeToolchain {
            path: path.to_path_buf(),
        })
    }

    /// Path of the generated file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn required<'a>(value: Option<&'a Path>, key: &str) -> Result<&'a Path> {
    value.with_context(|| {
        format!(
            "toolchain `{}` is not configured; set it under [toolchain] in microros.toml",
            key
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> ToolchainSettings {
        ToolchainSettings {
            cc: Some(PathBuf::from("/opt/gcc/bin/arm-none-eabi-gcc")),
            cxx: Some(PathBuf::from("/opt/gcc/bin/arm-none-eabi-g++")),
            ar: Some(PathBuf::from("/opt/gcc/bin/arm-none-eabi-ar")),
            cflags: vec!["-ffunction-sections".to_string(), "-mthumb".to_string()],
            cxxflags: vec!["-fno-rtti".to_string()],
        }
    }

    #[test]
    fn test_generate_renders_settings() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("toolchain.cmake");

        let toolchain = CMakeToolchain::generate(&path, &settings()).unwrap();
        assert_eq!(toolchain.path(), path);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("set(CMAKE_SYSTEM_NAME Generic)"));
        assert!(contents.contains("set(CMAKE_CROSSCOMPILING 1)"));
        assert!(contents.contains("set(CMAKE_C_COMPILER /opt/gcc/bin/arm-none-eabi-gcc)"));
        assert!(contents.contains("set(CMAKE_AR /opt/gcc/bin/arm-none-eabi-ar)"));
        assert!(contents
            .contains("set(CMAKE_C_FLAGS_INIT \"-ffunction-sections -mthumb\" CACHE STRING"));
    }

    #[test]
    fn test_generate_requires_compilers() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("toolchain.cmake");

        let mut incomplete = settings();
        incomplete.cxx = None;

        let err = CMakeToolchain::generate(&path, &incomplete).unwrap_err();
        assert!(err.to_string().contains("`cxx`"));
        assert!(!path.exists());
    }
}
