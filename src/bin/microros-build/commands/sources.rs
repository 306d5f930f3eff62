//! `microros-build sources` command
//!
//! Lists the catalog sources a distro's build would fetch, per stage,
//! plus the default ignore-list.

use anyhow::{bail, Result};

use microros_build::core::catalog::{Distro, SourceCatalog};
use microros_build::core::source::Stage;

use crate::cli::SourcesArgs;

pub fn execute(args: SourcesArgs) -> Result<()> {
    let distro: Distro = args.distro.parse()?;

    let stages: Vec<Stage> = match args.stage.as_deref() {
        None => vec![Stage::Dev, Stage::Mcu],
        Some("dev") => vec![Stage::Dev],
        Some("mcu") => vec![Stage::Mcu],
        Some(other) => bail!("unknown stage `{}`; expected `dev` or `mcu`", other),
    };

    for stage in stages {
        println!("{} {} sources:", distro, stage);
        for source in SourceCatalog::sources_for(distro, stage)? {
            match source.version() {
                Some(version) => {
                    println!("  {:<34} {} @ {}", source.name(), source.url(), version)
                }
                None => println!("  {:<34} {}", source.name(), source.url()),
            }
        }
        println!();
    }

    println!("ignored by default:");
    for name in SourceCatalog::default_ignore_list(distro) {
        println!("  {}", name);
    }

    Ok(())
}
