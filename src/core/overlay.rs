//! Extra-packages overlay.
//!
//! Users can drop a folder of local packages next to the project, together
//! with an `extra_packages.repos` manifest naming additional repositories
//! to fetch. The overlay is optional and best-effort: a missing or
//! malformed manifest yields an empty set, and individual entries missing
//! required fields are skipped rather than failing the whole load. After
//! the manifest's repositories are fetched, the folder itself is copied
//! over the mcu source tree, overwriting catalog-fetched content.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use url::Url;

use crate::core::source::{Source, Stage};
use crate::util::fs::overlay_dir;

/// Manifest file naming extra repositories to fetch.
pub const MANIFEST_FILE: &str = "extra_packages.repos";

/// Raw manifest as deserialized from YAML. Every field is optional so
/// malformed entries surface as skips, not parse failures.
#[derive(Debug, Default, Deserialize)]
struct RawManifest {
    #[serde(default)]
    repositories: Option<BTreeMap<String, RawEntry>>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<String>,
    version: Option<String>,
}

/// A resolved manifest entry.
#[derive(Debug, Clone)]
pub struct OverlayEntry {
    /// Declared repository type (e.g. "git")
    pub kind: String,
    /// Origin URL
    pub url: Url,
    /// Branch, tag, or revision, if pinned
    pub version: Option<String>,
}

/// The loaded extra-packages manifest: repository path key to entry.
#[derive(Debug, Default)]
pub struct ManifestOverlay {
    entries: BTreeMap<String, OverlayEntry>,
}

impl ManifestOverlay {
    /// Load a manifest, tolerating partial or missing data.
    ///
    /// An absent file, a YAML parse failure, or a missing `repositories`
    /// collection all yield an empty overlay. Entries missing `type` or
    /// `url` (or carrying an unparseable URL) are dropped individually.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::debug!("no extra packages manifest at {}: {}", path.display(), err);
                return Self::default();
            }
        };

        let raw: RawManifest = match serde_yaml::from_str(&contents) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("error on {}: {}", path.display(), err);
                return Self::default();
            }
        };

        let mut entries = BTreeMap::new();
        for (repo_path, raw_entry) in raw.repositories.unwrap_or_default() {
            let (Some(kind), Some(url)) = (raw_entry.kind, raw_entry.url) else {
                tracing::warn!(
                    "skipping `{}`: entry is missing `type` or `url`",
                    repo_path
                );
                continue;
            };

            let url = match Url::parse(&url) {
                Ok(url) => url,
                Err(err) => {
                    tracing::warn!("skipping `{}`: invalid url: {}", repo_path, err);
                    continue;
                }
            };

            entries.insert(
                repo_path,
                OverlayEntry {
                    kind,
                    url,
                    version: raw_entry.version,
                },
            );
        }

        ManifestOverlay { entries }
    }

    /// Resolved entries, keyed by repository path.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &OverlayEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of resolved entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the overlay resolved no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turn the resolved entries into mcu-stage sources, cloned into the
    /// target source tree under their repository path keys.
    pub fn sources(&self) -> Result<Vec<Source>> {
        self.entries
            .iter()
            .map(|(repo_path, entry)| {
                Source::new(
                    repo_path.clone(),
                    entry.url.as_str(),
                    entry.version.as_deref(),
                    Stage::Mcu,
                )
            })
            .collect()
    }

    /// Copy the extra-packages folder over the target source tree,
    /// overwriting existing paths. The manifest file itself is never
    /// copied.
    pub fn apply_folder(packages_folder: &Path, src_root: &Path) -> Result<()> {
        overlay_dir(packages_folder, src_root, &[MANIFEST_FILE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let overlay = ManifestOverlay::load(&tmp.path().join(MANIFEST_FILE));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_load_malformed_yaml_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_FILE);
        std::fs::write(&path, "repositories: [not: {a mapping").unwrap();

        let overlay = ManifestOverlay::load(&path);
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_load_skips_incomplete_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_FILE);
        std::fs::write(
            &path,
            r#"
repositories:
  drivers/imu_driver:
    type: git
    url: https://github.com/example/imu_driver
    version: main
  broken/no_url:
    type: git
  sensors/range_driver:
    type: git
    url: https://github.com/example/range_driver
"#,
        )
        .unwrap();

        let overlay = ManifestOverlay::load(&path);
        assert_eq!(overlay.len(), 2);
        assert!(overlay
            .entries()
            .all(|(path, _)| path != "broken/no_url"));

        let sources = overlay.sources().unwrap();
        assert_eq!(sources.len(), 2);
        let imu = sources
            .iter()
            .find(|s| s.name() == "drivers/imu_driver")
            .unwrap();
        assert_eq!(imu.version(), Some("main"));
        assert_eq!(imu.stage(), Stage::Mcu);
    }

    #[test]
    fn test_apply_folder_precedence_and_manifest_exclusion() {
        let tmp = TempDir::new().unwrap();
        let extra = tmp.path().join("extra_packages");
        let src = tmp.path().join("src");
        std::fs::create_dir_all(extra.join("my_pkg")).unwrap();
        std::fs::create_dir_all(&src).unwrap();

        std::fs::write(src.join("foo.txt"), "catalog").unwrap();
        std::fs::write(extra.join("foo.txt"), "overlay").unwrap();
        std::fs::write(extra.join("my_pkg/package.xml"), "<name>my_pkg</name>").unwrap();
        std::fs::write(extra.join(MANIFEST_FILE), "repositories:\n").unwrap();

        ManifestOverlay::apply_folder(&extra, &src).unwrap();

        assert_eq!(
            std::fs::read_to_string(src.join("foo.txt")).unwrap(),
            "overlay"
        );
        assert!(src.join("my_pkg/package.xml").exists());
        assert!(!src.join(MANIFEST_FILE).exists());
    }
}
