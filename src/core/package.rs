//! Package tracking with inclusion/exclusion overrides.
//!
//! Packages are discovered by scanning a fetched source checkout for
//! `package.xml` manifests. Ignore state is kept in an explicit set keyed
//! by `(source, package)` so every change is auditable; marking a package
//! ignored also drops a `COLCON_IGNORE` marker into its directory, which
//! the external orchestrator honors when selecting packages to build.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use crate::core::source::Source;

/// Name suffix of secondary-language binding packages. These are never
/// needed for the embedded target and are always skipped.
pub const BINDING_SUFFIX: &str = "_cpp";

/// Marker file the orchestrator checks before building a package.
pub const IGNORE_MARKER: &str = "COLCON_IGNORE";

/// Manifest file identifying a package root.
const PACKAGE_MANIFEST: &str = "package.xml";

/// A buildable unit inside a source.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name, scoped to the owning source
    name: String,

    /// Name of the owning source
    source: String,

    /// Package directory inside the source checkout
    path: PathBuf,
}

impl Package {
    /// Create a package owned by `source`, rooted at `path`.
    pub fn new(name: impl Into<String>, source: impl Into<String>, path: PathBuf) -> Self {
        Package {
            name: name.into(),
            source: source.into(),
            path,
        }
    }

    /// Get the package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the owning source name.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the package directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Key identifying this package within the set.
    pub fn key(&self) -> PackageKey {
        PackageKey {
            source: self.source.clone(),
            package: self.name.clone(),
        }
    }

    fn write_ignore_marker(&self) -> Result<()> {
        std::fs::write(self.path.join(IGNORE_MARKER), "").with_context(|| {
            format!(
                "failed to write {} for package `{}`",
                IGNORE_MARKER, self.name
            )
        })
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.name)
    }
}

/// Identity of a package: name scoped to its owning source.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackageKey {
    pub source: String,
    pub package: String,
}

/// The set of packages discovered across all fetched sources, together
/// with their ignore state.
///
/// Ignore state is strictly additive: once a package is ignored nothing
/// re-includes it within the same run.
#[derive(Debug, Default)]
pub struct PackageSet {
    packages: Vec<Package>,
    ignored: BTreeSet<PackageKey>,
}

impl PackageSet {
    /// Create an empty package set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package. Re-registering the same (source, name) pair is
    /// a no-op; returns whether the package was newly added.
    pub fn register(&mut self, package: Package) -> bool {
        let exists = self
            .packages
            .iter()
            .any(|p| p.source == package.source && p.name == package.name);
        if exists {
            return false;
        }
        self.packages.push(package);
        true
    }

    /// Discover the packages of a fetched source checkout and register
    /// them, applying the auto-ignore rule for each newly discovered
    /// package: a package is ignored when its name is in
    /// `default_ignore` or carries the secondary-language binding suffix.
    ///
    /// Returns `(name, ignored)` pairs in discovery order for progress
    /// reporting.
    pub fn discover(
        &mut self,
        source: &Source,
        checkout: &Path,
        default_ignore: &[&str],
    ) -> Result<Vec<(String, bool)>> {
        let mut discovered = Vec::new();

        for entry in WalkDir::new(checkout)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == PACKAGE_MANIFEST)
        {
            let manifest = std::fs::read_to_string(entry.path()).with_context(|| {
                format!("failed to read package manifest: {}", entry.path().display())
            })?;

            let Some(name) = package_name_from_manifest(&manifest) else {
                tracing::warn!(
                    "skipping manifest without a package name: {}",
                    entry.path().display()
                );
                continue;
            };

            let dir = entry
                .path()
                .parent()
                .unwrap_or(checkout)
                .to_path_buf();
            let package = Package::new(name.clone(), source.name(), dir);

            if !self.register(package) {
                continue;
            }

            let auto_ignore =
                default_ignore.contains(&name.as_str()) || name.ends_with(BINDING_SUFFIX);
            if auto_ignore {
                self.ignore(&name)?;
            }

            discovered.push((name, auto_ignore));
        }

        Ok(discovered)
    }

    /// Mark every registered package matching `name` as ignored, across
    /// all sources. A no-op, not an error, when nothing matches.
    pub fn ignore(&mut self, name: &str) -> Result<()> {
        for package in self.packages.iter().filter(|p| p.name == name) {
            if self.ignored.insert(package.key()) {
                package.write_ignore_marker()?;
            }
        }
        Ok(())
    }

    /// Check whether any package with this name is ignored.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored
            .iter()
            .any(|key| key.package == name)
    }

    /// Iterate over all registered packages.
    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    /// Number of registered packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// The ignored keys, for auditing.
    pub fn ignored_keys(&self) -> impl Iterator<Item = &PackageKey> {
        self.ignored.iter()
    }
}

/// Extract the package name from a `package.xml` manifest.
fn package_name_from_manifest(xml: &str) -> Option<String> {
    let re = Regex::new(r"<name>\s*([A-Za-z0-9_\-]+)\s*</name>").unwrap();
    re.captures(xml).map(|c| c[1].to_string())
}
