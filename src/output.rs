//! Output path composition and post-processing.
//!
//! Turns one pipeline result into bytes on disk: structural (NXFN) or
//! synthetic naming, ZIP expansion into a sibling directory, and the
//! zstd dual-write (decompressed content plus, unless configured away,
//! the original compressed artifact).

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::compression;
use crate::{Error, Result};

/// Tracks output paths already claimed within one container, so two
/// entries resolving to the same path fail fast instead of silently
/// overwriting each other.
#[derive(Default)]
pub struct PathRegistry {
    claimed: HashSet<PathBuf>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, path: PathBuf) -> Result<PathBuf> {
        if !self.claimed.insert(path.clone()) {
            return Err(Error::PathCollision(path));
        }
        Ok(path)
    }
}

/// Compose the final path for one entry, honoring structural naming
/// when a name survived from the NXFN table and NXFN output is enabled.
pub fn compose_path(
    base: &Path,
    index: usize,
    ext: &str,
    name: Option<&str>,
    write_nxfn: bool,
    registry: &mut PathRegistry,
) -> Result<PathBuf> {
    let path = match name.filter(|_| write_nxfn) {
        Some(name) => base.join(name),
        None => base.join(format!("{index:08}.{ext}")),
    };
    registry.claim(path)
}

/// Write `data` (already sniffed as `ext`) to `path`, performing any
/// extension-specific post-processing (`zip` expansion, `zst` dual
/// write).
pub fn write_entry(path: &Path, ext: &str, data: &[u8], delete_compressed: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(Error::OutputIOError)?;
    }

    match ext {
        "zst" => write_zst(path, data, delete_compressed),
        "zip" => write_zip(path, data, delete_compressed),
        _ => fs::write(path, data).map_err(Error::OutputIOError),
    }
}

fn write_zst(path: &Path, data: &[u8], delete_compressed: bool) -> Result<()> {
    let decompressed = compression::zstd::decompress(data)?;
    fs::write(path, &decompressed).map_err(Error::OutputIOError)?;

    if !delete_compressed {
        let raw_path = append_extension(path, "zst");
        fs::write(raw_path, data).map_err(Error::OutputIOError)?;
    }
    Ok(())
}

fn write_zip(path: &Path, data: &[u8], delete_compressed: bool) -> Result<()> {
    fs::write(path, data).map_err(Error::OutputIOError)?;

    let expand_dir = strip_extension(path, "zip");
    expand_zip(path, &expand_dir)?;

    if delete_compressed {
        fs::remove_file(path).map_err(Error::OutputIOError)?;
    }
    Ok(())
}

fn expand_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::open(archive_path).map_err(Error::OutputIOError)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::Zip(e.to_string()))?;

    for i in 0..archive.len() {
        let mut member = archive.by_index(i).map_err(|e| Error::Zip(e.to_string()))?;
        let Some(member_path) = member.enclosed_name() else {
            continue;
        };
        let out_path = dest.join(member_path);

        if member.is_dir() {
            fs::create_dir_all(&out_path).map_err(Error::OutputIOError)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(Error::OutputIOError)?;
        }
        let mut out_file = fs::File::create(&out_path).map_err(Error::OutputIOError)?;
        io::copy(&mut member, &mut out_file).map_err(Error::OutputIOError)?;
    }
    Ok(())
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".");
    os.push(ext);
    PathBuf::from(os)
}

/// Strip a trailing `.ext` suffix from `path`, or return it unchanged if
/// it doesn't carry that extension.
fn strip_extension(path: &Path, ext: &str) -> PathBuf {
    match path.extension() {
        Some(e) if e == ext => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}
