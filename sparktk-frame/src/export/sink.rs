//! Text sinks persist a `Collection<String>` as sharded text output, one shard per partition.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sparktk_core::deferred::try_batch_apply;
use sparktk_core::scheduler::{GreedyScheduler, Scheduler};
use uuid::Uuid;

use crate::collection::Collection;
use crate::error::{FrameError, Result};

/// Directory holding in-flight shards until the job commits
pub const TEMPORARY_DIR: &str = "_temporary";

/// Empty marker written once every shard is in place
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Name of the shard holding partition `idx`
pub fn shard_name(idx: usize) -> String {
    format!("part-{:05}", idx)
}

/// Outcome of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Output directory
    pub path: PathBuf,
    /// Number of shard files written
    pub shards: usize,
    /// Number of lines written across all shards
    pub lines: usize,
}

/// Something that can persist lines of text to a path.
pub trait TextSink {
    /// Writes every line of `lines` under `path`.  Either all shards are written or an error
    /// is returned and nothing is left at `path`.
    fn save_as_text_file(&mut self, lines: &Collection<String>, path: &Path) -> Result<ExportSummary>;
}

#[derive(Debug, Clone)]
struct ShardReport {
    file: String,
    lines: usize,
}

/// Writes shards to the local file system, evaluating partitions on scheduler `S`.
///
/// Layout of a committed output directory:
///
/// ```text
/// <path>/part-00000
/// <path>/part-00001
/// <path>/_SUCCESS
/// ```
///
/// Every line is terminated by `\n`.
pub struct LocalTextSink<S = GreedyScheduler> {
    scheduler: S,
}

impl Default for LocalTextSink<GreedyScheduler> {
    fn default() -> Self {
        LocalTextSink::with_scheduler(GreedyScheduler::default())
    }
}

impl LocalTextSink<GreedyScheduler> {
    /// Sink backed by a `GreedyScheduler` sized to the machine
    pub fn new() -> Self {
        LocalTextSink::default()
    }
}

impl<S: Scheduler> LocalTextSink<S> {
    /// Sink evaluating partitions on `scheduler`
    pub fn with_scheduler(scheduler: S) -> Self {
        LocalTextSink { scheduler }
    }

    fn write_shards(&mut self, lines: &Collection<String>, staging: &Path) -> Result<Vec<ShardReport>> {
        fs::create_dir_all(staging).map_err(|e| FrameError::io(staging, e))?;
        let dir = Arc::new(staging.to_path_buf());
        let shards = try_batch_apply(lines.to_defs(), move |idx, vs: &Vec<String>| {
            write_shard(&dir, idx, vs).map(|report| vec![report])
        });
        Collection::from_defs(shards).run(&mut self.scheduler)
    }
}

impl<S: Scheduler> TextSink for LocalTextSink<S> {
    fn save_as_text_file(&mut self, lines: &Collection<String>, path: &Path) -> Result<ExportSummary> {
        let job = Uuid::new_v4();
        let created = claim_target(path, job)?;
        let staging = path.join(TEMPORARY_DIR).join(job.to_string());
        debug!("Job {}: writing {} partitions to {}", job, lines.n_partitions(), path.display());

        let outcome = self
            .write_shards(lines, &staging)
            .and_then(|reports| commit(path, &staging, reports));

        if let Err(ref e) = outcome {
            debug!("Job {} failed: {}", job, e);
            discard(&created, job);
        }
        outcome
    }
}

// Topmost ancestor of `path`, or `path` itself, that does not exist yet.
fn first_missing(path: &Path) -> PathBuf {
    let mut top = path;
    while let Some(parent) = top.parent() {
        if parent.as_os_str().is_empty() || parent.exists() {
            break;
        }
        top = parent;
    }
    top.to_path_buf()
}

// Creates the output directory, failing if it is already present.  `create_dir` is atomic,
// so of two jobs racing for one path only one gets it.  Returns the outermost directory the
// job created, which is what a failed job removes.
fn claim_target(path: &Path, job: Uuid) -> Result<PathBuf> {
    let created = first_missing(path);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = fs::create_dir_all(parent) {
            if created != path {
                discard(&created, job);
            }
            return Err(FrameError::io(parent, e));
        }
    }
    match fs::create_dir(path) {
        Ok(()) => Ok(created),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(FrameError::PathExists(path.to_path_buf())),
        Err(e) => {
            if created != path {
                discard(&created, job);
            }
            Err(FrameError::io(path, e))
        }
    }
}

fn discard(dir: &Path, job: Uuid) {
    debug!("Job {}: removing {}", job, dir.display());
    if let Err(cleanup) = fs::remove_dir_all(dir) {
        warn!("Unable to remove {} after failed job {}: {}", dir.display(), job, cleanup);
    }
}

fn write_shard(dir: &Path, idx: usize, lines: &[String]) -> Result<ShardReport> {
    let file = shard_name(idx);
    let target = dir.join(&file);
    trace!("Writing {} lines to {}", lines.len(), target.display());

    let fd = File::create(&target).map_err(|e| FrameError::io(&target, e))?;
    let mut bw = BufWriter::new(fd);
    for line in lines {
        bw.write_all(line.as_bytes())
            .and_then(|_| bw.write_all(b"\n"))
            .map_err(|e| FrameError::io(&target, e))?;
    }
    bw.flush().map_err(|e| FrameError::io(&target, e))?;

    Ok(ShardReport {
        file,
        lines: lines.len(),
    })
}

// Moves every staged shard into place, then drops the staging area and marks success.
fn commit(path: &Path, staging: &Path, reports: Vec<ShardReport>) -> Result<ExportSummary> {
    for report in reports.iter() {
        let from = staging.join(&report.file);
        let to = path.join(&report.file);
        fs::rename(&from, &to).map_err(|e| FrameError::io(&from, e))?;
    }
    let temporary = path.join(TEMPORARY_DIR);
    fs::remove_dir_all(&temporary).map_err(|e| FrameError::io(&temporary, e))?;

    let marker = path.join(SUCCESS_MARKER);
    File::create(&marker).map_err(|e| FrameError::io(&marker, e))?;

    let summary = ExportSummary {
        path: path.to_path_buf(),
        shards: reports.len(),
        lines: reports.iter().map(|r| r.lines).sum(),
    };
    info!("Wrote {} lines in {} shards to {}", summary.lines, summary.shards, path.display());
    Ok(summary)
}
