//! Mesh references: externally stored mesh files.
//!
//! A reference is persisted as a path relative to the scene file plus the
//! absolute path it had when stored. On restore the file is searched for in
//! a fixed order of candidate locations, which tolerates both the scene and
//! the mesh directory being moved.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::util::{DVec3, Result};

/// Triangle mesh read from an external file.
#[derive(Clone, Debug, Default)]
pub struct ImportedMesh {
    pub vertices: Vec<DVec3>,
    pub triangles: Vec<[i32; 3]>,
    /// Per-triangle material ids; empty when the file has none.
    pub material_ids: Vec<i32>,
}

/// Reads referenced mesh files.
pub trait MeshImporter {
    /// Whether a candidate path exists.
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Load the mesh at `path`.
    fn read_mesh(&self, path: &Path) -> Result<ImportedMesh>;
}

/// Path of `target` relative to directory `base`.
///
/// Returns `None` when the two paths share no root (different drive, or one
/// absolute and one relative).
pub fn relative_path(base: &Path, target: &Path) -> Option<PathBuf> {
    let base: Vec<Component> = base.components().filter(|c| *c != Component::CurDir).collect();
    let target: Vec<Component> = target.components().filter(|c| *c != Component::CurDir).collect();

    let rooted = |c: Option<&Component>| matches!(c, Some(Component::Prefix(_) | Component::RootDir));
    if base.first() != target.first() && (rooted(base.first()) || rooted(target.first())) {
        return None;
    }

    let common = base.iter().zip(&target).take_while(|(a, b)| a == b).count();
    let mut out = PathBuf::new();
    for _ in &base[common..] {
        out.push("..");
    }
    for c in &target[common..] {
        out.push(c.as_os_str());
    }
    Some(out)
}

/// Render a relative path with `/` separators.
pub(crate) fn portable_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Candidate locations for a referenced file, in search order:
///
/// 1. scene directory joined with the relative path
/// 2. scene directory joined with the file's base name
/// 3. scene directory joined with the relative directory chain, leading
///    components dropped one at a time, then the base name
/// 4. the absolute path
/// 5. scene directory joined with the last directory of the absolute path
///    and the base name
pub fn reference_candidates(scene_dir: &Path, relative: Option<&str>, absolute: Option<&str>) -> Vec<PathBuf> {
    let relative = relative.filter(|s| !s.is_empty()).map(Path::new);
    let absolute = absolute.filter(|s| !s.is_empty()).map(Path::new);
    let base_name = relative.and_then(Path::file_name).or_else(|| absolute.and_then(Path::file_name));

    let mut candidates = Vec::new();
    if let Some(rel) = relative {
        candidates.push(scene_dir.join(rel));
    }
    if let Some(name) = base_name {
        candidates.push(scene_dir.join(name));
    }
    if let (Some(rel), Some(name)) = (relative, base_name) {
        let dirs: Vec<&OsStr> = rel
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| match c {
                        Component::Normal(s) => Some(s),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        for start in 0..dirs.len() {
            let mut path = scene_dir.to_path_buf();
            path.extend(&dirs[start..]);
            path.push(name);
            candidates.push(path);
        }
    }
    if let Some(abs) = absolute {
        candidates.push(abs.to_path_buf());
        let last_dir = abs.parent().and_then(Path::file_name);
        if let (Some(dir), Some(name)) = (last_dir, base_name) {
            candidates.push(scene_dir.join(dir).join(name));
        }
    }

    let mut unique: Vec<PathBuf> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !unique.contains(&c) {
            unique.push(c);
        }
    }
    unique
}

/// First candidate the importer reports as existing.
pub fn resolve_reference(
    importer: &dyn MeshImporter,
    scene_dir: &Path,
    relative: Option<&str>,
    absolute: Option<&str>,
) -> Option<PathBuf> {
    reference_candidates(scene_dir, relative, absolute).into_iter().find(|path| {
        let found = importer.file_exists(path);
        debug!(path = %path.display(), found, "mesh reference candidate");
        found
    })
}
