//! Source - one fetched repository contributing one or more packages.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use url::Url;

/// Build stage a source participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Host-side dependency stage
    Dev,
    /// Target cross-compiled stage
    Mcu,
}

impl Stage {
    /// Get the stage name as used in the build tree layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Dev => "dev",
            Stage::Mcu => "mcu",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source repository participating in a build.
///
/// Immutable after creation; once fetched, only its discovered packages
/// matter.
#[derive(Debug, Clone)]
pub struct Source {
    /// Source name, doubling as the checkout path relative to the stage's
    /// source tree
    name: String,

    /// Origin URL
    url: Url,

    /// Branch, tag, or revision to check out (default branch when absent)
    version: Option<String>,

    /// Stage this source is fetched for
    stage: Stage,
}

impl Source {
    /// Create a source, validating its origin URL.
    pub fn new(
        name: impl Into<String>,
        url: &str,
        version: Option<&str>,
        stage: Stage,
    ) -> Result<Self> {
        let name = name.into();
        let url = Url::parse(url)
            .with_context(|| format!("invalid url for source `{}`: {}", name, url))?;

        Ok(Source {
            name,
            url,
            version: version.map(str::to_string),
            stage,
        })
    }

    /// Get the source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the origin URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the version (branch, tag, or revision), if pinned.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Get the build stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Checkout directory of this source under the stage's source tree.
    pub fn checkout_dir(&self, src_root: &Path) -> PathBuf {
        src_root.join(&self.name)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} ({}@{})", self.name, self.url, version),
            None => write!(f, "{} ({})", self.name, self.url),
        }
    }
}
