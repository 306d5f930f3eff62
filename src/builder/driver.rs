//! Build driver - sequences the pipeline.
//!
//! The stages run strictly in order, each completing (including blocking
//! on external processes) before the next begins; the build tree is the
//! only state passed between them. Every stage either is idempotent or
//! cleans its own output first, so re-running after a failure is safe.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::builder::colcon;
use crate::builder::context::BuildContext;
use crate::builder::merge::ArchiveMerger;
use crate::builder::toolchain::CMakeToolchain;
use crate::core::catalog::SourceCatalog;
use crate::core::overlay::{ManifestOverlay, MANIFEST_FILE};
use crate::core::package::PackageSet;
use crate::core::source::Stage;
use crate::sources::fetch_source;
use crate::util::config::Config;
use crate::util::fs::ensure_dir;
use crate::util::shell::{Shell, Status};

/// Orchestrates fetch, build, and merge for one project.
pub struct BuildDriver<'a> {
    ctx: BuildContext,
    config: &'a Config,
    shell: &'a Shell,
    packages: PackageSet,
}

impl<'a> BuildDriver<'a> {
    /// Create a driver for the given context and configuration.
    pub fn new(ctx: BuildContext, config: &'a Config, shell: &'a Shell) -> Self {
        BuildDriver {
            ctx,
            config,
            shell,
            packages: PackageSet::new(),
        }
    }

    /// Run the full pipeline. A present final artifact makes the whole
    /// run a cache hit.
    pub fn run(&mut self, extra_ignores: &[String]) -> Result<()> {
        if self.ctx.library_path().exists() {
            self.shell
                .status(Status::Skipped, "micro-ROS already built");
            return Ok(());
        }

        self.fetch_dev_sources()?;

        self.shell
            .status(Status::Building, "micro-ROS dev dependencies");
        colcon::build_dev(&self.ctx, self.python_env().as_deref())?;

        self.fetch_mcu_sources()?;

        for name in extra_ignores {
            self.packages.ignore(name)?;
        }

        self.shell.status(Status::Building, "micro-ROS library");
        self.build_mcu()?;

        let merger = ArchiveMerger::new(&self.ctx)?;
        merger.run(self.shell)?;

        self.shell.status(
            Status::Finished,
            format!("library at {}", self.ctx.library_path().display()),
        );
        Ok(())
    }

    /// The package set built up by the fetch stages.
    pub fn packages(&self) -> &PackageSet {
        &self.packages
    }

    fn python_env(&self) -> Option<PathBuf> {
        self.config
            .project
            .python_env
            .as_ref()
            .map(|p| self.ctx.project_dir().join(p))
    }

    fn fetch_dev_sources(&mut self) -> Result<()> {
        let src_root = self.ctx.dev_src_dir();
        ensure_dir(&src_root)?;

        self.shell
            .status(Status::Fetching, "micro-ROS dev dependencies");
        let sources = SourceCatalog::sources_for(self.ctx.distro(), Stage::Dev)?;
        let progress = self.shell.progress(sources.len() as u64, "fetching");

        for source in &sources {
            let checkout = fetch_source(source, &src_root)?;
            self.packages.discover(source, &checkout, &[])?;
            self.shell
                .status(Status::Downloaded, source.name());
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(())
    }

    fn fetch_mcu_sources(&mut self) -> Result<()> {
        let src_root = self.ctx.mcu_src_dir();
        ensure_dir(&src_root)?;

        self.shell.status(Status::Fetching, "micro-ROS library");
        let sources = SourceCatalog::sources_for(self.ctx.distro(), Stage::Mcu)?;
        let default_ignore = SourceCatalog::default_ignore_list(self.ctx.distro());
        let progress = self.shell.progress(sources.len() as u64, "fetching");

        for source in &sources {
            let checkout = fetch_source(source, &src_root)?;
            let discovered = self
                .packages
                .discover(source, &checkout, default_ignore)?;

            for (name, ignored) in discovered {
                if ignored {
                    self.shell
                        .status(Status::Ignored, format!("{} (ignored)", name));
                } else {
                    self.shell.status(Status::Downloaded, name);
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        self.fetch_extra_packages(&src_root)?;

        Ok(())
    }

    /// Fetch the repositories named by the extra-packages manifest, then
    /// overlay the extra-packages folder onto the mcu source tree.
    fn fetch_extra_packages(&mut self, src_root: &std::path::Path) -> Result<()> {
        let Some(folder) = self.config.project.extra_packages.as_ref() else {
            return Ok(());
        };
        let folder = self.ctx.project_dir().join(folder);
        if !folder.exists() {
            self.shell
                .note("extra packages folder not found, skipping");
            return Ok(());
        }

        self.shell.status(Status::Fetching, "extra packages");
        let overlay = ManifestOverlay::load(&folder.join(MANIFEST_FILE));

        for source in overlay.sources()? {
            let checkout = fetch_source(&source, src_root)?;
            self.packages.discover(&source, &checkout, &[])?;
            self.shell.status(Status::Downloaded, source.name());
        }

        ManifestOverlay::apply_folder(&folder, src_root)
            .context("failed to overlay extra packages")?;
        self.shell.status(Status::Added, folder.display());

        Ok(())
    }

    fn build_mcu(&self) -> Result<()> {
        let toolchain = CMakeToolchain::generate(
            &self.ctx.mcu_dir().join("toolchain.cmake"),
            &self.config.toolchain,
        )?;

        let merged_meta =
            colcon::write_merged_meta(&self.ctx, self.config.colcon.meta.as_ref())?;

        colcon::build_mcu(
            &self.ctx,
            &self.config.colcon,
            self.python_env().as_deref(),
            &toolchain,
            &merged_meta,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Distro;
    use tempfile::TempDir;

    #[test]
    fn test_run_is_a_noop_when_artifact_exists() {
        let tmp = TempDir::new().unwrap();
        let ctx = BuildContext::new(tmp.path(), Distro::Humble).unwrap();

        std::fs::create_dir_all(ctx.library_dir()).unwrap();
        std::fs::write(ctx.library_path(), "existing").unwrap();

        let config = Config::default();
        let shell = Shell::default();
        let mut driver = BuildDriver::new(ctx.clone(), &config, &shell);

        // No network, no colcon, no archiver: the cache hit returns
        // before any collaborator is touched.
        driver.run(&[]).unwrap();

        assert!(driver.packages().is_empty());
        assert_eq!(
            std::fs::read_to_string(ctx.library_path()).unwrap(),
            "existing"
        );
    }
}
