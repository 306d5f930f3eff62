//! `microros-build build` command

use std::path::PathBuf;

use anyhow::{Context, Result};

use microros_build::builder::{BuildContext, BuildDriver};
use microros_build::core::catalog::Distro;
use microros_build::util::config::Config;
use microros_build::util::diagnostic::{emit, suggestions, Diagnostic};
use microros_build::util::shell::Shell;

use crate::cli::{BuildArgs, GlobalFlags};

pub fn execute(flags: GlobalFlags, args: BuildArgs) -> Result<()> {
    let project_dir = args
        .project_dir
        .unwrap_or_else(|| PathBuf::from("."));
    let shell = Shell::from_flags(flags.quiet, flags.verbose, flags.no_color);

    let config = Config::load_or_default(&project_dir)?;

    let distro = resolve_distro(args.distro.as_deref(), &config)?;
    let ctx = BuildContext::new(&project_dir, distro)?;

    let mut driver = BuildDriver::new(ctx, &config, &shell);
    if let Err(err) = driver.run(&args.ignores) {
        emit(
            &Diagnostic::error(format!("{:#}", err))
                .with_suggestion(suggestions::BUILD_FAILED),
            !flags.no_color,
        );
        std::process::exit(1);
    }

    Ok(())
}

fn resolve_distro(flag: Option<&str>, config: &Config) -> Result<Distro> {
    let name = flag
        .or(config.project.distro.as_deref())
        .with_context(|| format!("no distro configured\n{}", suggestions::NO_DISTRO))?;

    Ok(name.parse::<Distro>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_distro_flag_beats_config() {
        let mut config = Config::default();
        config.project.distro = Some("humble".to_string());

        let distro = resolve_distro(Some("jazzy"), &config).unwrap();
        assert_eq!(distro, Distro::Jazzy);

        let distro = resolve_distro(None, &config).unwrap();
        assert_eq!(distro, Distro::Humble);
    }

    #[test]
    fn test_resolve_distro_requires_some_source() {
        let config = Config::default();
        let err = resolve_distro(None, &config).unwrap_err();
        assert!(err.to_string().contains("no distro configured"));
    }
}
