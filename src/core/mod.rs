//! Core model: sources, packages, catalogs, and the extra-packages overlay.

pub mod catalog;
pub mod overlay;
pub mod package;
pub mod source;

pub use catalog::{Distro, SourceCatalog};
pub use overlay::ManifestOverlay;
pub use package::{Package, PackageKey, PackageSet};
pub use source::{Source, Stage};
