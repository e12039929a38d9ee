//! Filesystem layer extraction.
//!
//! An image root is the ordered union of its layers: each layer is applied
//! on top of the previous ones. Whiteout entries delete content contributed
//! by lower layers (`.wh.<name>` removes one path, `.wh..wh..opq` empties a
//! directory), so every archive is read twice: once to apply its whiteouts,
//! once to unpack its regular entries.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use burrow_common::error::{BurrowError, Result};
use burrow_common::types::Sha256Hash;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const WHITEOUT_PREFIX: &str = ".wh.";
const OPAQUE_WHITEOUT: &str = ".wh..wh..opq";

/// A single filesystem layer applied to a root.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Content hash of the layer archive.
    pub hash: Sha256Hash,
    /// Size of the archive in bytes.
    pub size_bytes: u64,
    /// Number of whiteouts applied.
    pub whiteouts: usize,
}

/// A deletion recorded in a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Whiteout {
    /// Remove this path (relative to the root).
    Remove(PathBuf),
    /// Remove every child of this directory (relative to the root).
    Opaque(PathBuf),
}

/// Applies a sequence of layer archives to `target`, lowest layer first.
///
/// # Errors
///
/// Returns the first extraction error; later layers are not applied.
pub fn apply_layers(archives: &[PathBuf], target: &Path) -> Result<Vec<Layer>> {
    archives
        .iter()
        .map(|archive| extract_layer(archive, target))
        .collect()
}

/// Extracts one tar archive (plain or gzip-compressed) onto `target`.
///
/// # Errors
///
/// Returns an error if the archive cannot be read, a whiteout cannot be
/// applied, or an entry cannot be unpacked.
pub fn extract_layer(archive_path: &Path, target: &Path) -> Result<Layer> {
    tracing::info!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting layer"
    );

    std::fs::create_dir_all(target).map_err(|e| BurrowError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;

    let size_bytes = std::fs::metadata(archive_path)
        .map_err(|e| BurrowError::Io {
            path: archive_path.to_path_buf(),
            source: e,
        })?
        .len();

    let whiteouts = collect_whiteouts(archive_path)?;
    for whiteout in &whiteouts {
        apply_whiteout(target, whiteout)?;
    }
    unpack_regular_entries(archive_path, target)?;

    let hash = crate::hash::hash_file(archive_path)?;
    tracing::info!(%hash, size = size_bytes, whiteouts = whiteouts.len(), "layer extracted");

    Ok(Layer {
        hash,
        size_bytes,
        whiteouts: whiteouts.len(),
    })
}

/// Opens an archive, transparently decompressing gzip content.
fn open_archive(path: &Path) -> Result<tar::Archive<Box<dyn Read>>> {
    let io_err = |e| BurrowError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let reader: Box<dyn Read> = if is_gzip(path)? {
        Box::new(flate2::read::GzDecoder::new(BufReader::new(
            File::open(path).map_err(io_err)?,
        )))
    } else {
        Box::new(BufReader::new(File::open(path).map_err(io_err)?))
    };
    Ok(tar::Archive::new(reader))
}

/// Detects gzip by magic bytes; registry blobs carry no file extension.
fn is_gzip(path: &Path) -> Result<bool> {
    let mut magic = [0_u8; 2];
    let mut file = File::open(path).map_err(|e| BurrowError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(BurrowError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn collect_whiteouts(archive_path: &Path) -> Result<Vec<Whiteout>> {
    let mut archive = open_archive(archive_path)?;
    let mut whiteouts = Vec::new();
    for entry in archive.entries().map_err(|e| tar_err(archive_path, e))? {
        let entry = entry.map_err(|e| tar_err(archive_path, e))?;
        let path = entry.path().map_err(|e| tar_err(archive_path, e))?;
        if let Some(whiteout) = parse_whiteout(&path) {
            whiteouts.push(whiteout);
        }
    }
    Ok(whiteouts)
}

fn unpack_regular_entries(archive_path: &Path, target: &Path) -> Result<()> {
    let mut archive = open_archive(archive_path)?;
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);
    for entry in archive.entries().map_err(|e| tar_err(archive_path, e))? {
        let mut entry = entry.map_err(|e| tar_err(archive_path, e))?;
        let path = entry
            .path()
            .map_err(|e| tar_err(archive_path, e))?
            .into_owned();
        if is_whiteout_name(&path) {
            continue;
        }
        // Entries that would land outside the target are skipped by tar.
        if !entry.unpack_in(target).map_err(|e| BurrowError::Io {
            path: target.join(&path),
            source: e,
        })? {
            tracing::warn!(entry = %path.display(), "skipped entry outside the root");
        }
    }
    Ok(())
}

fn tar_err(archive_path: &Path, source: std::io::Error) -> BurrowError {
    BurrowError::Io {
        path: archive_path.to_path_buf(),
        source,
    }
}

fn is_whiteout_name(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.starts_with(WHITEOUT_PREFIX))
}

/// Interprets an archive path as a whiteout, if it is one.
///
/// Paths that are absolute-looking are re-rooted; paths containing `..` are
/// never treated as whiteouts.
fn parse_whiteout(path: &Path) -> Option<Whiteout> {
    let relative = confine(path)?;
    let name = relative.file_name()?.to_str()?;
    let parent = relative.parent().map(Path::to_path_buf).unwrap_or_default();
    if name == OPAQUE_WHITEOUT {
        Some(Whiteout::Opaque(parent))
    } else {
        let hidden = name.strip_prefix(WHITEOUT_PREFIX)?;
        if hidden.is_empty() {
            return None;
        }
        Some(Whiteout::Remove(parent.join(hidden)))
    }
}

fn confine(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    Some(out)
}

fn apply_whiteout(target: &Path, whiteout: &Whiteout) -> Result<()> {
    match whiteout {
        Whiteout::Remove(relative) => {
            tracing::debug!(path = %relative.display(), "whiteout");
            // Removal never follows the last component, so only parents are checked.
            match resolve_in_root(target, relative, false)? {
                Some(path) => remove_path(&path),
                None => Ok(()),
            }
        }
        Whiteout::Opaque(relative) => {
            tracing::debug!(dir = %relative.display(), "opaque whiteout");
            let Some(dir) = resolve_in_root(target, relative, true)? else {
                return Ok(());
            };
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(BurrowError::Io { path: dir, source: e }),
            };
            for entry in entries {
                let entry = entry.map_err(|e| BurrowError::Io {
                    path: dir.clone(),
                    source: e,
                })?;
                remove_path(&entry.path())?;
            }
            Ok(())
        }
    }
}

/// Joins `relative` onto `target` one component at a time.
///
/// Returns `None` when the path does not exist or passes through a symlink,
/// which could point outside the root. With `check_last` the final
/// component must not be a symlink either.
fn resolve_in_root(target: &Path, relative: &Path, check_last: bool) -> Result<Option<PathBuf>> {
    let mut path = target.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        path.push(component);
        if components.peek().is_none() && !check_last {
            break;
        }
        match std::fs::symlink_metadata(&path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                tracing::warn!(
                    path = %path.display(),
                    "whiteout through symlink ignored"
                );
                return Ok(None);
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BurrowError::Io { path, source: e }),
        }
    }
    Ok(Some(path))
}

/// Removes a file, symlink, or directory tree. Missing paths are fine.
fn remove_path(path: &Path) -> Result<()> {
    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BurrowError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
