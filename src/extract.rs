//! Two-tier parallel extraction driver.
//!
//! Outer tier: each `.npk`/`.expk` file handed to [`extract_dir`] runs on
//! its own worker thread, opening its own file handle - mirroring the
//! process-isolation goal of the source tool without literal process
//! spawning. Inner tier: inside one container, the header and index are
//! read sequentially, then entries are unwrapped and written in
//! parallel by a [`rayon`] pool; only the `read(offset, length)` calls
//! stay on the thread that owns the file handle, so contention never
//! grows with worker count.

use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::container::{Container, Entry};
use crate::crypto::Cipher;
use crate::nxs3::NxS3Decoder;
use crate::output::{self, PathRegistry};
use crate::pipeline::Pipeline;
use crate::utils::bytesv;
use crate::{Error, Result};

/// Caller-tunable knobs for one extraction run.
pub struct ExtractConfig {
    /// Base output directory. Defaults to the container path with its
    /// extension stripped (for a single file) or the directory itself
    /// (for a batch run).
    pub output_dir: Option<PathBuf>,
    /// Use NXFN structural names when present; if `false`, every entry
    /// gets a synthetic `{index:08}.{ext}` name.
    pub write_nxfn: bool,
    /// Remove `.zip`/`.zst` intermediate artifacts after expansion.
    pub delete_compressed: bool,
    /// Outer-tier worker count. Defaults to the host CPU count.
    pub workers: usize,
    /// Policy for `de_nxs3` subprocess failures.
    pub nxs3_on_failure: crate::nxs3::OnFailure,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            output_dir: None,
            write_nxfn: true,
            delete_compressed: false,
            workers: num_cpus(),
            nxs3_on_failure: crate::nxs3::OnFailure::default(),
        }
    }
}

fn num_cpus() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Progress callback contract.
///
/// Invoked with a monotonically non-decreasing percentage in `[0, 100]`.
/// Implementations must be safe to call from multiple worker threads
/// concurrently; [`ProgressSink`] itself only requires `Send + Sync`,
/// serialization is the implementation's responsibility.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, percent: u8);
}

/// A [`ProgressSink`] that does nothing.
pub struct NullProgress;
impl ProgressSink for NullProgress {
    fn on_progress(&self, _percent: u8) {}
}

/// Extract every `.npk`/`.expk` file directly inside `dir` (non-recursive),
/// one outer-tier worker per file.
pub fn extract_dir(
    dir: &Path,
    config: &ExtractConfig,
    cipher: Option<&(dyn Cipher + Sync)>,
    nxs3_binary: Option<&str>,
    progress: &(dyn ProgressSink),
) -> Result<()> {
    let files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(Error::Io)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("npk") | Some("expk")
                )
        })
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| {
            Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;

    let completed = Mutex::new(0usize);
    let total = files.len().max(1);

    pool.install(|| {
        files.par_iter().for_each(|path| {
            let outcome = extract_file(path, config, cipher, nxs3_binary, progress);
            if let Err(e) = outcome {
                tracing::error!(file = %path.display(), error = %e, "container extraction failed");
            }
            let mut done = completed.lock().unwrap();
            *done += 1;
            let percent = ((*done * 100) / total).min(100) as u8;
            progress.on_progress(percent);
        });
    });

    Ok(())
}

/// Extract a single container file.
///
/// On header/index failure, the (empty) output directory is removed and
/// the error is returned. Per-entry failures are logged and skipped;
/// this function still returns `Ok` in that case.
pub fn extract_file(
    path: &Path,
    config: &ExtractConfig,
    cipher: Option<&(dyn Cipher + Sync)>,
    nxs3_binary: Option<&str>,
    progress: &(dyn ProgressSink),
) -> Result<()> {
    let base = config
        .output_dir
        .clone()
        .unwrap_or_else(|| path.with_extension(""));

    let mut file = fs::File::open(path).map_err(Error::Io)?;

    let container = match Container::parse(&mut file, cipher) {
        Ok(c) => c,
        Err(e) => {
            let _ = fs::remove_dir(&base);
            return Err(e);
        }
    };

    fs::create_dir_all(&base).map_err(Error::OutputIOError)?;

    if config.write_nxfn && container.entries.iter().any(|e| e.name.is_some()) {
        write_nxfn_result(&base, &container.entries)?;
    }

    let nxs3_decoder = nxs3_binary.map(|bin| NxS3Decoder::new(bin, config.nxs3_on_failure));
    let pipeline = Pipeline::new(cipher, nxs3_decoder.as_ref());
    let registry = Mutex::new(PathRegistry::new());

    // Inner tier: reads happen here, sequentially, on the thread that
    // owns `file`; the CPU-bound unwrap+write work is handed to rayon.
    let reads: Vec<Result<(usize, Vec<u8>)>> = container
        .entries
        .iter()
        .map(|entry| {
            file.seek(SeekFrom::Start(entry.record.offset as u64))
                .map_err(Error::Io)?;
            let raw = bytesv(&mut file, entry.record.length as usize)?;
            Ok((entry.index, raw))
        })
        .collect();

    let entries_completed = Mutex::new(0usize);
    let total_entries = container.entries.len().max(1);

    reads
        .into_par_iter()
        .zip(container.entries.par_iter())
        .for_each(|(read_result, entry)| {
            let raw = match read_result {
                Ok((_, raw)) => raw,
                Err(e) => {
                    tracing::warn!(sign = entry.record.sign, offset = entry.record.offset, index = entry.index, error = %e, "failed to read entry");
                    report_entry_progress(&entries_completed, total_entries, progress);
                    return;
                }
            };

            tracing::debug!(
                sign = entry.record.sign,
                offset = entry.record.offset,
                length = entry.record.length,
                flag = entry.record.flag,
                index = entry.index,
                "processing entry"
            );

            let result = pipeline
                .process(raw, container.header.magic, &entry.record)
                .and_then(|unwrapped| {
                    let mut registry = registry.lock().unwrap();
                    let out_path = output::compose_path(
                        &base,
                        entry.index,
                        unwrapped.ext,
                        entry.name.as_deref(),
                        config.write_nxfn,
                        &mut registry,
                    )?;
                    drop(registry);
                    output::write_entry(&out_path, unwrapped.ext, &unwrapped.data, config.delete_compressed)
                });

            if let Err(e) = result {
                tracing::warn!(sign = entry.record.sign, offset = entry.record.offset, index = entry.index, error = %e, "entry processing failed, skipping");
            }

            report_entry_progress(&entries_completed, total_entries, progress);
        });

    if container.entries.is_empty() {
        let _ = fs::remove_dir(&base);
    }

    Ok(())
}

/// Bump `completed` and report this container's per-entry percentage to
/// `progress`, serializing the lock/notify pair so two workers can't
/// interleave an update out of order.
fn report_entry_progress(completed: &Mutex<usize>, total: usize, progress: &dyn ProgressSink) {
    let mut done = completed.lock().unwrap();
    *done += 1;
    let percent = ((*done * 100) / total).min(100) as u8;
    progress.on_progress(percent);
}

/// Write the recovered NXFN names, one per line in record order, to
/// `NXFN_result.txt` alongside the extracted entries — preserved from
/// the original tool's side-file output, which the distilled container
/// format description otherwise drops.
fn write_nxfn_result(base: &Path, entries: &[Entry]) -> Result<()> {
    let mut contents = String::new();
    for entry in entries {
        contents.push_str(entry.name.as_deref().unwrap_or(""));
        contents.push('\n');
    }
    fs::write(base.join("NXFN_result.txt"), contents).map_err(Error::OutputIOError)
}
