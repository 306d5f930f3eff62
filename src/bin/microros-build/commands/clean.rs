//! `microros-build clean` command

use std::path::PathBuf;

use anyhow::Result;

use microros_build::util::fs::remove_dir_all_if_exists;
use microros_build::util::shell::{Shell, Status};

use crate::cli::{CleanArgs, GlobalFlags};

pub fn execute(flags: GlobalFlags, args: CleanArgs) -> Result<()> {
    let project_dir = args
        .project_dir
        .unwrap_or_else(|| PathBuf::from("."));
    let shell = Shell::from_flags(flags.quiet, flags.verbose, flags.no_color);

    let build_dir = project_dir.join("build");
    remove_dir_all_if_exists(&build_dir)?;
    shell.status(Status::Finished, format!("removed {}", build_dir.display()));

    if args.all {
        let library_dir = project_dir.join("libmicroros");
        remove_dir_all_if_exists(&library_dir)?;
        shell.status(
            Status::Finished,
            format!("removed {}", library_dir.display()),
        );
    }

    Ok(())
}
