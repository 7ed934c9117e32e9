use std::{
    ffi::{OsStr, OsString},
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use crate::assets::decode::join_drain;
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::format::MediaFormat;
use crate::foundation::error::{ConvertError, ConvertResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared flag used to stop an export from another thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`CancelToken::cancel`] has been called.
    pub fn check(&self) -> ConvertResult<()> {
        if self.is_cancelled() {
            return Err(ConvertError::Cancelled);
        }
        Ok(())
    }
}

/// Terminal state of an export session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExportStatus {
    Completed,
    Failed(String),
    Cancelled,
}

impl ExportStatus {
    pub fn into_result(self, output: PathBuf) -> ConvertResult<PathBuf> {
        match self {
            ExportStatus::Completed => Ok(output),
            ExportStatus::Failed(msg) => Err(ConvertError::export(msg)),
            ExportStatus::Cancelled => Err(ConvertError::Cancelled),
        }
    }
}

/// One supervised `ffmpeg` invocation writing a single output file.
///
/// The command line is `program -y -hide_banner -loglevel error <args> <output>`.
#[derive(Clone, Debug)]
pub struct ExportJob {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub output: PathBuf,
}

impl ExportJob {
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<OsString>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            output: output.into(),
        }
    }

    /// Full argument vector handed to the program.
    pub fn command_args(&self) -> Vec<OsString> {
        let mut v: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();
        v.extend(self.args.iter().cloned());
        v.push(self.output.clone().into_os_string());
        v
    }

    /// Run to completion, polling `cancel`. Partial output is removed unless the job completed.
    #[tracing::instrument(level = "debug", skip_all, fields(output = %self.output.display()))]
    pub fn run(&self, cancel: &CancelToken) -> ExportStatus {
        if cancel.is_cancelled() {
            return ExportStatus::Cancelled;
        }
        if let Err(e) = ensure_parent_dir(&self.output) {
            return ExportStatus::Failed(e.to_string());
        }

        let mut child = match Command::new(&self.program)
            .args(self.command_args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(c) => c,
            Err(e) => {
                return ExportStatus::Failed(format!(
                    "failed to spawn '{}': {e}",
                    self.program.display()
                ));
            }
        };

        let stderr_drain = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut bytes = Vec::new();
                stderr.read_to_end(&mut bytes)?;
                Ok(bytes)
            })
        });

        let status = loop {
            if cancel.is_cancelled() {
                let _ = child.kill();
                let _ = child.wait();
                let _ = join_drain(stderr_drain);
                remove_partial(&self.output);
                tracing::info!("export cancelled");
                return ExportStatus::Cancelled;
            }
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    let _ = child.kill();
                    remove_partial(&self.output);
                    return ExportStatus::Failed(format!("failed to wait for ffmpeg: {e}"));
                }
            }
        };

        let stderr = join_drain(stderr_drain).unwrap_or_default();
        if !status.success() {
            remove_partial(&self.output);
            return ExportStatus::Failed(format!(
                "ffmpeg exited with status {status}: {}",
                String::from_utf8_lossy(&stderr).trim()
            ));
        }
        if !self.output.is_file() {
            return ExportStatus::Failed(format!(
                "ffmpeg reported success but '{}' was not written",
                self.output.display()
            ));
        }
        ExportStatus::Completed
    }

    /// [`ExportJob::run`] mapped onto the error taxonomy.
    pub fn run_checked(&self, cancel: &CancelToken) -> ConvertResult<PathBuf> {
        self.run(cancel).into_result(self.output.clone())
    }
}

/// Delete a partially written output, ignoring "already gone".
pub fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "could not remove partial output"
        ),
    }
}

/// Produces unique output paths: `<dir>/<prefix><uuid>.<ext>`.
#[derive(Clone, Debug)]
pub struct OutputNamer {
    dir: PathBuf,
}

impl OutputNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn next(&self, prefix: &str, format: MediaFormat) -> PathBuf {
        self.dir.join(format!(
            "{prefix}{}.{}",
            uuid::Uuid::new_v4(),
            format.extension()
        ))
    }
}

/// Shorthand for building ffmpeg argument vectors from mixed strings and paths.
pub(crate) fn os_args<I, S>(items: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    items.into_iter().map(|s| s.as_ref().to_os_string()).collect()
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
