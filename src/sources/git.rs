//! Git fetch collaborator.
//!
//! Sources are cloned with libgit2 into the stage's source tree. The
//! optional version field is resolved as a remote branch first, then as a
//! tag or revision. A checkout that already exists is left untouched, so
//! re-running a failed pipeline does not re-clone.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use git2::{Repository, ResetType};

use crate::core::source::Source;

/// Clone `source` into the stage source tree, checking out its pinned
/// version when one is set. Returns the checkout directory.
pub fn fetch_source(source: &Source, src_root: &Path) -> Result<PathBuf> {
    let checkout = source.checkout_dir(src_root);

    if checkout.exists() {
        tracing::debug!("{} already fetched, skipping clone", source.name());
        return Ok(checkout);
    }

    if let Some(parent) = checkout.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    tracing::info!("cloning {}", source.url());
    let repo = Repository::clone(source.url().as_str(), &checkout)
        .with_context(|| format!("failed to clone {}", source.url()))?;

    if let Some(version) = source.version() {
        checkout_version(&repo, version)
            .with_context(|| format!("failed to check out `{}` of {}", version, source.name()))?;
    }

    Ok(checkout)
}

/// Check out a branch, tag, or revision by name.
fn checkout_version(repo: &Repository, version: &str) -> Result<()> {
    // Remote branches resolve as origin/<name>; tags and revisions resolve
    // directly.
    let object = repo
        .revparse_single(&format!("origin/{}", version))
        .or_else(|_| repo.revparse_single(version))?;

    let commit = object.peel_to_commit()?;
    repo.reset(commit.as_object(), ResetType::Hard, None)?;

    Ok(())
}
