//! Directory batch driver.
//!
//! [`BatchRunner`] walks a directory tree, runs the crop pipeline on every
//! supported image and mirrors the tree under an output root. Every file
//! gets exactly one summary row; a failing file never stops the batch.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::core::config::{BatchConfig, ConfigError, ConfigValidator};
use crate::core::errors::{PipelineError, PipelineResult};
use crate::pipeline::cropper::SmartCropper;
use crate::pipeline::stats::{BatchStats, StatsManager};
use crate::pipeline::summary::{SummaryRow, SummaryTable};

/// One discovered input and where its crop goes.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BatchJob {
    source: PathBuf,
    relative: String,
    destination: PathBuf,
}

/// Runs the crop pipeline over a directory tree.
#[derive(Debug)]
pub struct BatchRunner {
    config: BatchConfig,
    cropper: SmartCropper,
    stats: StatsManager,
}

impl BatchRunner {
    /// Creates a runner after validating the configuration.
    pub fn new(config: BatchConfig) -> PipelineResult<Self> {
        config.validate()?;
        let cropper = SmartCropper::new(config.pipeline.clone())?;
        Ok(Self {
            config,
            cropper,
            stats: StatsManager::new(),
        })
    }

    /// The configuration this runner was created with.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Statistics of the most recent run.
    pub fn stats(&self) -> BatchStats {
        self.stats.get_stats()
    }

    /// Processes every supported image below `root`, writing crops under `out`.
    ///
    /// Rows are ordered by source path. Failures are recorded in their rows.
    /// Statistics start from zero on every call.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfiguration`] when `out` is `root`
    /// itself, since every crop would replace its source photograph, and
    /// [`PipelineError::Enumerate`] when `root` cannot be listed. No other
    /// error aborts the batch.
    pub fn run(&self, root: &Path, out: &Path) -> PipelineResult<SummaryTable> {
        let started = Instant::now();
        let skip = out.canonicalize().ok();
        if skip.is_some() && skip == root.canonicalize().ok() {
            return Err(ConfigError::InvalidConfig {
                message: format!("output directory {} is the input directory", out.display()),
            }
            .into());
        }

        self.stats.reset_stats();
        let files = self.discover(root, skip.as_deref())?;
        let jobs = self.plan(root, out, files);

        info!(
            files = jobs.len(),
            root = %root.display(),
            out = %out.display(),
            "batch started"
        );

        let rows: Vec<SummaryRow> = if jobs.len() <= self.config.parallel.batch_threshold {
            jobs.iter().map(|job| self.process_job(job)).collect()
        } else {
            self.in_pool(|| jobs.par_iter().map(|job| self.process_job(job)).collect())
        };

        self.stats.set_elapsed(started.elapsed().as_secs_f64() * 1000.0);
        let table = SummaryTable::new(rows);
        info!(
            total = table.len(),
            succeeded = table.succeeded(),
            failed = table.failed(),
            "batch finished"
        );
        Ok(table)
    }

    /// Writes the delimited summary under `out` with the configured file name.
    pub fn save_summary(&self, table: &SummaryTable, out: &Path) -> PipelineResult<PathBuf> {
        std::fs::create_dir_all(out)
            .map_err(|e| PipelineError::io(format!("creating {}", out.display()), e))?;
        let path = out.join(&self.config.summary_file_name);
        table.save_delimited(&path)?;
        Ok(path)
    }

    /// Lists supported files below `root` in sorted order.
    ///
    /// The directory `skip` (canonical path) is not descended into, so an
    /// output root inside the input tree is never read back as input.
    fn discover(&self, root: &Path, skip: Option<&Path>) -> PipelineResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(source) if dir.as_path() == root => {
                    return Err(PipelineError::Enumerate {
                        path: root.to_path_buf(),
                        source,
                    });
                }
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
            };

            for entry in entries.filter_map(Result::ok) {
                let path = entry.path();
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };

                if file_type.is_dir() {
                    let is_output = skip.is_some_and(|skip| {
                        path.canonicalize().is_ok_and(|canonical| canonical.as_path() == skip)
                    });
                    if is_output {
                        debug!(dir = %path.display(), "skipping output directory");
                    } else {
                        pending.push(path);
                    }
                } else if (file_type.is_file() || path.is_file()) && self.is_supported(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.config.accepts_extension(e))
    }

    /// Maps sources to destinations, mirroring the tree under `out`.
    ///
    /// The extension follows the output format. Sources that would land on
    /// the same destination (`chip.jpg` and `chip.bmp`) keep their lowercased
    /// extension in the stem instead. Names are compared case-insensitively,
    /// and a name that is still taken, or that is one of the sources, gets a
    /// numeric suffix (`chip_png_2.png`), so no two jobs share a file and no
    /// job writes over an input.
    fn plan(&self, root: &Path, out: &Path, files: Vec<PathBuf>) -> Vec<BatchJob> {
        let extension = self.config.pipeline.output_format.extension();
        let relative_of = |path: &Path| -> PathBuf {
            path.strip_prefix(root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.file_name().map(PathBuf::from).unwrap_or_default())
        };

        let mut natural: HashMap<String, usize> = HashMap::new();
        for path in &files {
            *natural
                .entry(fold_case(&relative_of(path).with_extension(extension)))
                .or_insert(0) += 1;
        }
        let sources: HashSet<String> = files.iter().map(|path| fold_case(path)).collect();
        let mut claimed: HashSet<String> = HashSet::new();

        files
            .into_iter()
            .map(|source| {
                let relative = relative_of(&source);
                let mut target = relative.with_extension(extension);
                let stem = relative
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let base = if natural.get(&fold_case(&target)).copied().unwrap_or(0) > 1 {
                    let source_ext = relative
                        .extension()
                        .map(|s| s.to_string_lossy().to_lowercase())
                        .unwrap_or_default();
                    format!("{stem}_{source_ext}")
                } else {
                    stem
                };
                target.set_file_name(format!("{base}.{extension}"));

                let mut suffix = 2;
                while claimed.contains(&fold_case(&target))
                    || sources.contains(&fold_case(&out.join(&target)))
                {
                    target.set_file_name(format!("{base}_{suffix}.{extension}"));
                    suffix += 1;
                }
                claimed.insert(fold_case(&target));

                BatchJob {
                    relative: display_relative(&relative),
                    destination: out.join(target),
                    source,
                }
            })
            .collect()
    }

    fn process_job(&self, job: &BatchJob) -> SummaryRow {
        let started = Instant::now();
        let outcome = self.crop_to_file(job);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(row) => {
                self.stats.record(Ok(()), elapsed_ms);
                info!(
                    file = %job.relative,
                    width = ?row.width,
                    height = ?row.height,
                    angle = ?row.angle,
                    "cropped"
                );
                row
            }
            Err(error) => {
                self.stats.record(Err(error.kind()), elapsed_ms);
                warn!(file = %job.relative, kind = %error.kind(), error = %error, "failed");
                SummaryRow::failure(job.relative.clone(), &error)
            }
        }
    }

    fn crop_to_file(&self, job: &BatchJob) -> PipelineResult<SummaryRow> {
        let bytes = std::fs::read(&job.source)
            .map_err(|e| PipelineError::io(format!("reading {}", job.source.display()), e))?;
        let output = self.cropper.process(&bytes)?;

        if let Some(parent) = job.destination.parent() {
            // Tolerates concurrent creation of the same directory.
            std::fs::create_dir_all(parent)
                .map_err(|e| PipelineError::io(format!("creating {}", parent.display()), e))?;
        }
        std::fs::write(&job.destination, &output.cropped_bytes).map_err(|e| {
            PipelineError::io(format!("writing {}", job.destination.display()), e)
        })?;

        Ok(SummaryRow::success(job.relative.clone(), output.record))
    }

    /// Runs `op` on a pool limited to `max_threads`, or on the global pool.
    fn in_pool<R, F>(&self, op: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        let Some(threads) = self.config.parallel.max_threads else {
            return op();
        };
        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(op),
            Err(e) => {
                warn!(threads, error = %e, "cannot build worker pool, using the global pool");
                op()
            }
        }
    }
}

/// Comparison key of a path on case-insensitive file systems.
fn fold_case(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

/// Relative path with `/` separators, independent of the platform.
fn display_relative(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Runs a batch with `config`.
///
/// Equivalent to [`BatchRunner::new`] followed by [`BatchRunner::run`].
pub fn process_batch(root: &Path, out: &Path, config: &BatchConfig) -> PipelineResult<SummaryTable> {
    BatchRunner::new(config.clone())?.run(root, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::OutputFormat;
    use crate::core::errors::ErrorKind;
    use tempfile::TempDir;

    fn touch(path: &Path, bytes: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_discovery_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("b.png"), b"x");
        touch(&root.join("a.JPG"), b"x");
        touch(&root.join("notes.txt"), b"x");
        touch(&root.join("sub/c.tif"), b"x");

        let runner = BatchRunner::new(BatchConfig::default()).unwrap();
        let files = runner.discover(root, None).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| display_relative(p.strip_prefix(root).unwrap()))
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "sub/c.tif"]);
    }

    #[test]
    fn test_output_inside_root_is_skipped() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("a.png"), b"x");
        touch(&root.join("out/old.png"), b"x");

        let runner = BatchRunner::new(BatchConfig::default()).unwrap();
        let skip = root.join("out").canonicalize().unwrap();
        let files = runner.discover(root, Some(&skip)).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = process_batch(
            &dir.path().join("missing"),
            &dir.path().join("out"),
            &BatchConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Enumerate { .. }));
    }

    #[test]
    fn test_plan_mirrors_tree_and_resolves_collisions() {
        let runner = BatchRunner::new(BatchConfig::default()).unwrap();
        let root = Path::new("/data/in");
        let out = Path::new("/data/out");
        let jobs = runner.plan(
            root,
            out,
            vec![
                root.join("lot1/chip.bmp"),
                root.join("lot1/chip.jpg"),
                root.join("lot2/other.jpeg"),
            ],
        );

        assert_eq!(jobs[0].destination, out.join("lot1/chip_bmp.png"));
        assert_eq!(jobs[1].destination, out.join("lot1/chip_jpg.png"));
        assert_eq!(jobs[2].destination, out.join("lot2/other.png"));
        assert_eq!(jobs[2].relative, "lot2/other.jpeg");
    }

    #[test]
    fn test_plan_separates_names_differing_in_case() {
        let runner = BatchRunner::new(BatchConfig::default()).unwrap();
        let root = Path::new("/data/in");
        let out = Path::new("/data/out");
        let jobs = runner.plan(
            root,
            out,
            vec![
                root.join("lot/chip.PNG"),
                root.join("lot/chip.png"),
                root.join("lot/chip_png.jpg"),
            ],
        );

        assert_eq!(jobs[0].destination, out.join("lot/chip_png.png"));
        assert_eq!(jobs[1].destination, out.join("lot/chip_png_2.png"));
        assert_eq!(jobs[2].destination, out.join("lot/chip_png_3.png"));
    }

    #[test]
    fn test_plan_never_targets_a_source() {
        let runner = BatchRunner::new(BatchConfig::default()).unwrap();
        let root = Path::new("/data/in");
        let jobs = runner.plan(root, root, vec![root.join("a.png"), root.join("b.jpg")]);

        assert_eq!(jobs[0].destination, root.join("a_2.png"));
        assert_eq!(jobs[1].destination, root.join("b.png"));
    }

    #[test]
    fn test_output_equal_to_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("chip.png"), b"original bytes");

        let err = process_batch(dir.path(), dir.path(), &BatchConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
        assert_eq!(
            std::fs::read(dir.path().join("chip.png")).unwrap(),
            b"original bytes"
        );
    }

    #[test]
    fn test_stats_restart_with_each_run() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("one.png"), b"not a png");
        touch(&root.join("two.png"), b"not a png either");

        let runner = BatchRunner::new(BatchConfig::default()).unwrap();
        runner.run(&root, &dir.path().join("out")).unwrap();
        runner.run(&root, &dir.path().join("out")).unwrap();

        let stats = runner.stats();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.failed, 2);
    }

    #[test]
    fn test_undecodable_files_become_failed_rows() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("in");
        touch(&root.join("one.png"), b"not a png");
        touch(&root.join("deep/two.jpg"), b"");

        let mut config = BatchConfig::default();
        config.pipeline.output_format = OutputFormat::Jpeg { quality: 80 };
        let runner = BatchRunner::new(config).unwrap();
        let table = runner.run(&root, &dir.path().join("out")).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.failed(), 2);
        assert!(
            table
                .rows
                .iter()
                .all(|r| r.error_kind == Some(ErrorKind::DecodeError))
        );
        assert_eq!(runner.stats().failed, 2);
    }
}
