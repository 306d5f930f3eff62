//! microros-build - A build tool for the micro-ROS static library
//!
//! This crate assembles a cross-compiled `libmicroros.a` from a set of
//! independently-versioned source repositories: it resolves which sources
//! and packages participate in a build, fetches them, drives `colcon`
//! through a host-side dev stage and a cross-compiled mcu stage, and
//! finally merges the per-package static archives into one deduplicated,
//! link-ready library with a flattened include tree.

pub mod builder;
pub mod core;
pub mod sources;
pub mod util;

pub use crate::core::{
    catalog::{Distro, SourceCatalog},
    overlay::ManifestOverlay,
    package::{Package, PackageSet},
    source::{Source, Stage},
};

pub use builder::{context::BuildContext, driver::BuildDriver, merge::ArchiveMerger};
pub use util::config::Config;
