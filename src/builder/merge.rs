//! Static-archive merge engine.
//!
//! The mcu stage installs one `.a` archive per package, and member object
//! names are only unique within their own archive. The merge extracts
//! every member, renames it to `<archive-stem>__<member>` (stems are
//! unique per input archive, so the compound name is globally unique),
//! re-archives everything into `libmicroros.a`, and rebuilds the symbol
//! index. The install space's include tree is then copied next to the
//! library and self-nested `include/<pkg>/<pkg>/` duplicates are
//! flattened away.
//!
//! The previous artifact is removed before any work starts, so a failed
//! merge never leaves a stale-but-present library behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::builder::context::{BuildContext, LIBRARY_NAME};
use crate::util::diagnostic::DuplicateArchiveStemError;
use crate::util::fs::{
    copy_dir_all, ensure_dir, merge_move_dir, move_file, remove_dir_all_if_exists,
};
use crate::util::process::{resolve_archiver, Archiver, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// Extension identifying input archives.
const ARCHIVE_EXT: &str = "a";

/// Separator between archive stem and member name in renamed members.
const STEM_SEPARATOR: &str = "__";

/// Merges the per-package archives of the mcu install space into one
/// collision-free static library.
pub struct ArchiveMerger<'a> {
    ctx: &'a BuildContext,
    archiver: Archiver,
}

impl<'a> ArchiveMerger<'a> {
    /// Create a merger, resolving the platform archiver pair. An
    /// unresolvable archiver is a fatal configuration error.
    pub fn new(ctx: &'a BuildContext) -> Result<Self> {
        let archiver = resolve_archiver()?;
        Ok(ArchiveMerger { ctx, archiver })
    }

    /// Run the merge: extract, rename, re-archive, index, and flatten.
    pub fn run(&self, shell: &Shell) -> Result<()> {
        let staging = self.ctx.staging_dir();
        let naming = staging.join("naming");
        let library_dir = self.ctx.library_dir();

        remove_dir_all_if_exists(&staging)?;
        remove_dir_all_if_exists(&library_dir)?;
        ensure_dir(&staging)?;
        ensure_dir(&library_dir)?;

        let lib_root = self.ctx.mcu_install_dir().join("lib");
        let archives = find_archives(&lib_root)?;
        shell.status(
            Status::Merging,
            format!("{} archives from {}", archives.len(), lib_root.display()),
        );

        for archive in &archives {
            self.extract_members(archive, &naming, &staging)?;
        }

        self.create_library(&staging)?;

        move_file(&staging.join(LIBRARY_NAME), &self.ctx.library_path())?;

        copy_dir_all(
            &self.ctx.mcu_install_dir().join("include"),
            &self.ctx.include_dir(),
        )?;
        flatten_include_tree(&self.ctx.include_dir())?;

        shell.status(Status::Merged, self.ctx.library_path().display());
        Ok(())
    }

    /// Extract one archive's members into `naming` and move them to
    /// `staging` under their collision-free compound names.
    fn extract_members(&self, archive: &Path, naming: &Path, staging: &Path) -> Result<()> {
        let stem = archive_stem(archive);

        remove_dir_all_if_exists(naming)?;
        ensure_dir(naming)?;

        ProcessBuilder::new(&self.archiver.ar)
            .arg("x")
            .arg(archive)
            .cwd(naming)
            .exec_and_check()
            .with_context(|| format!("failed to extract {}", archive.display()))?;

        for entry in std::fs::read_dir(naming)
            .with_context(|| format!("failed to read directory: {}", naming.display()))?
        {
            let entry = entry?;
            let member = entry.file_name();
            let renamed = format!("{}{}{}", stem, STEM_SEPARATOR, member.to_string_lossy());
            move_file(&entry.path(), &staging.join(renamed))?;
        }

        Ok(())
    }

    /// Archive every staged member into the library and rebuild its
    /// symbol index, then discard the staged members.
    fn create_library(&self, staging: &Path) -> Result<()> {
        let members = staged_members(staging)?;

        ProcessBuilder::new(&self.archiver.ar)
            .arg("rc")
            .arg(LIBRARY_NAME)
            .args(&members)
            .cwd(staging)
            .exec_and_check()
            .context("failed to create merged archive")?;

        // Linkers refuse archives with a stale index; the rebuild is not
        // optional.
        ProcessBuilder::new(&self.archiver.ranlib)
            .arg(LIBRARY_NAME)
            .cwd(staging)
            .exec_and_check()
            .context("failed to rebuild archive index")?;

        for member in &members {
            std::fs::remove_file(staging.join(member))
                .with_context(|| format!("failed to remove staged member: {}", member))?;
        }
        remove_dir_all_if_exists(&staging.join("naming"))?;

        Ok(())
    }
}

/// Collect every archive under `root`, rejecting inputs whose filename
/// stems collide: the rename rule would silently recreate a member
/// collision for them.
fn find_archives(root: &Path) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXT) {
            continue;
        }

        let stem = archive_stem(path);
        if let Some(first) = seen.get(&stem) {
            return Err(DuplicateArchiveStemError {
                stem,
                first: first.display().to_string(),
                second: path.display().to_string(),
            }
            .into());
        }

        seen.insert(stem, path.to_path_buf());
        archives.push(path.to_path_buf());
    }

    Ok(archives)
}

/// Filename of an archive with its extension removed.
fn archive_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Staged member names, sorted for a stable archive layout.
fn staged_members(staging: &Path) -> Result<Vec<String>> {
    let mut members = Vec::new();
    for entry in std::fs::read_dir(staging)
        .with_context(|| format!("failed to read directory: {}", staging.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            members.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    members.sort();
    Ok(members)
}

/// Flatten self-nested include directories.
///
/// Packages installing `include/<pkg>/<pkg>/...` get the inner duplicate
/// folded into `include/<pkg>/`. Idempotent: once the nested duplicate is
/// gone, a second pass finds nothing to do.
pub fn flatten_include_tree(include_root: &Path) -> Result<()> {
    if !include_root.exists() {
        return Ok(());
    }

    for entry in std::fs::read_dir(include_root)
        .with_context(|| format!("failed to read directory: {}", include_root.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let dir = entry.path();
        let nested = dir.join(entry.file_name());
        if nested.is_dir() {
            merge_move_dir(&nested, &dir)?;
            std::fs::remove_dir(&nested)
                .with_context(|| format!("failed to remove directory: {}", nested.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Distro;
    use std::fs;
    use tempfile::TempDir;

    /// The merge tests drive the real archiver; skip when the platform
    /// pair cannot be resolved.
    fn archiver() -> Option<Archiver> {
        match resolve_archiver() {
            Ok(archiver) => Some(archiver),
            Err(_) => {
                eprintln!("archiver not available, skipping");
                None
            }
        }
    }

    /// Build a real archive with `ar` from the given (member, contents)
    /// pairs.
    fn make_archive(ar: &Path, dir: &Path, name: &str, members: &[(&str, &str)]) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        for (member, contents) in members {
            fs::write(dir.join(member), contents).unwrap();
        }

        let archive = dir.join(name);
        let mut pb = ProcessBuilder::new(ar).arg("rc").arg(&archive).cwd(dir);
        for (member, _) in members {
            pb = pb.arg(member);
        }
        pb.exec_and_check().unwrap();

        for (member, _) in members {
            fs::remove_file(dir.join(member)).unwrap();
        }
        archive
    }

    fn list_members(ar: &Path, archive: &Path) -> Vec<String> {
        let output = ProcessBuilder::new(ar)
            .arg("t")
            .arg(archive)
            .exec_and_check()
            .unwrap();
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_archive_stem_strips_extension_only() {
        assert_eq!(archive_stem(Path::new("/x/librcl.a")), "librcl");
        assert_eq!(
            archive_stem(Path::new("libmicro-CDR.a")),
            "libmicro-CDR"
        );
    }

    #[test]
    fn test_merge_renames_colliding_members() {
        let Some(archiver) = archiver() else { return };
        let ar = archiver.ar;

        let tmp = TempDir::new().unwrap();
        let ctx = BuildContext::new(tmp.path(), Distro::Humble).unwrap();
        let lib_root = ctx.mcu_install_dir().join("lib");

        // Two archives that both contain a member named main.obj.
        make_archive(
            &ar,
            &lib_root.join("rcl"),
            "librcl.a",
            &[("main.obj", "rcl main"), ("node.obj", "rcl node")],
        );
        make_archive(
            &ar,
            &lib_root.join("rcutils"),
            "librcutils.a",
            &[("main.obj", "rcutils main")],
        );
        fs::create_dir_all(ctx.mcu_install_dir().join("include")).unwrap();

        let merger = ArchiveMerger::new(&ctx).unwrap();
        merger.run(&Shell::default()).unwrap();

        let members = list_members(&ar, &ctx.library_path());
        assert_eq!(members.len(), 3);
        assert!(members.contains(&"librcl__main.obj".to_string()));
        assert!(members.contains(&"librcl__node.obj".to_string()));
        assert!(members.contains(&"librcutils__main.obj".to_string()));

        let unique: std::collections::HashSet<_> = members.iter().collect();
        assert_eq!(unique.len(), members.len());

        // The staging area is discarded.
        assert!(!ctx.staging_dir().join("naming").exists());
    }

    #[test]
    fn test_duplicate_stems_in_different_dirs_are_rejected() {
        let Some(archiver) = archiver() else { return };
        let ar = archiver.ar;

        let tmp = TempDir::new().unwrap();
        let lib_root = tmp.path().join("lib");
        make_archive(&ar, &lib_root.join("a"), "libdup.a", &[("x.obj", "a")]);
        make_archive(&ar, &lib_root.join("b"), "libdup.a", &[("y.obj", "b")]);

        let err = find_archives(&lib_root).unwrap_err();
        assert!(err.to_string().contains("duplicate archive stem `libdup`"));
    }

    #[test]
    fn test_merge_removes_stale_artifact_first() {
        let Some(archiver) = archiver() else { return };
        let ar = archiver.ar;

        let tmp = TempDir::new().unwrap();
        let ctx = BuildContext::new(tmp.path(), Distro::Humble).unwrap();

        fs::create_dir_all(ctx.library_dir()).unwrap();
        fs::write(ctx.library_path(), "stale").unwrap();
        fs::write(ctx.library_dir().join("leftover.txt"), "old").unwrap();

        let lib_root = ctx.mcu_install_dir().join("lib");
        make_archive(&ar, &lib_root, "librmw.a", &[("rmw.obj", "rmw")]);
        fs::create_dir_all(ctx.mcu_install_dir().join("include")).unwrap();

        let merger = ArchiveMerger::new(&ctx).unwrap();
        merger.run(&Shell::default()).unwrap();

        assert!(!ctx.library_dir().join("leftover.txt").exists());
        let members = list_members(&ar, &ctx.library_path());
        assert_eq!(members, vec!["librmw__rmw.obj".to_string()]);
    }

    #[test]
    fn test_flatten_include_tree_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let include = tmp.path().join("include");

        // rcl installs include/rcl/rcl/*.h, rcutils is already flat.
        fs::create_dir_all(include.join("rcl/rcl/detail")).unwrap();
        fs::write(include.join("rcl/rcl/rcl.h"), "rcl").unwrap();
        fs::write(include.join("rcl/rcl/detail/impl.h"), "impl").unwrap();
        fs::create_dir_all(include.join("rcutils")).unwrap();
        fs::write(include.join("rcutils/rcutils.h"), "rcutils").unwrap();

        flatten_include_tree(&include).unwrap();

        assert!(include.join("rcl/rcl.h").exists());
        assert!(include.join("rcl/detail/impl.h").exists());
        assert!(!include.join("rcl/rcl").exists());
        assert!(include.join("rcutils/rcutils.h").exists());

        // Snapshot and run again: the tree does not change.
        let before: Vec<_> = WalkDir::new(&include)
            .sort_by_file_name()
            .into_iter()
            .map(|e| e.unwrap().path().to_path_buf())
            .collect();

        flatten_include_tree(&include).unwrap();

        let after: Vec<_> = WalkDir::new(&include)
            .sort_by_file_name()
            .into_iter()
            .map(|e| e.unwrap().path().to_path_buf())
            .collect();
        assert_eq!(before, after);
    }
}
