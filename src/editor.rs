//! Per-asset editing session: playback clock, trim selection and background export.

use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::Instant;

use crate::assets::probe::MediaAsset;
use crate::convert::Exporter;
use crate::encode::session::CancelToken;
use crate::foundation::core::{TimeRange, format_clock};
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::library::store::{LibraryStore, NewSavedFile, SavedFile};
use crate::request::{ConversionRequest, ExportResult};

/// Trim-handle step for one nudge.
pub const NUDGE_STEP_SEC: f64 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    Loaded,
    Playing,
    Paused,
    Exporting,
    Done,
    Failed,
}

impl EditorState {
    pub fn name(self) -> &'static str {
        match self {
            EditorState::Idle => "idle",
            EditorState::Loaded => "loaded",
            EditorState::Playing => "playing",
            EditorState::Paused => "paused",
            EditorState::Exporting => "exporting",
            EditorState::Done => "done",
            EditorState::Failed => "failed",
        }
    }
}

/// What a finished export produced.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportOutcome {
    pub result: ExportResult,
    /// Present when the export was started with a save name and a library is attached.
    pub saved: Option<SavedFile>,
}

struct InFlight {
    cancel: CancelToken,
    rx: mpsc::Receiver<ConvertResult<ExportOutcome>>,
    _worker: JoinHandle<()>,
}

pub struct EditorSession {
    exporter: Arc<dyn Exporter>,
    library: Option<Arc<LibraryStore>>,
    state: EditorState,
    asset: Option<MediaAsset>,
    position_sec: f64,
    playing_since: Option<Instant>,
    selection: TimeRange,
    export: Option<InFlight>,
}

impl EditorSession {
    pub fn new(exporter: Arc<dyn Exporter>) -> Self {
        Self {
            exporter,
            library: None,
            state: EditorState::Idle,
            asset: None,
            position_sec: 0.0,
            playing_since: None,
            selection: TimeRange::whole(0.0),
            export: None,
        }
    }

    /// Persist completed exports that were started with a save name.
    pub fn with_library(mut self, library: Arc<LibraryStore>) -> Self {
        self.library = Some(library);
        self
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn asset(&self) -> Option<&MediaAsset> {
        self.asset.as_ref()
    }

    pub fn selection(&self) -> TimeRange {
        self.selection
    }

    fn reject(&self, action: &'static str) -> ConvertError {
        ConvertError::invalid_transition(action, self.state.name())
    }

    fn loaded(&self, action: &'static str) -> ConvertResult<&MediaAsset> {
        if self.state == EditorState::Exporting {
            return Err(self.reject(action));
        }
        self.asset.as_ref().ok_or_else(|| self.reject(action))
    }

    fn duration(&self) -> f64 {
        self.asset.as_ref().map_or(0.0, |a| a.duration_sec)
    }

    /// Replace the current asset. The playhead and selection reset to the whole clip.
    pub fn load(&mut self, asset: MediaAsset) -> ConvertResult<()> {
        if self.state == EditorState::Exporting {
            return Err(self.reject("load"));
        }
        tracing::debug!(
            path = %asset.path.display(),
            duration = asset.duration_sec,
            "asset loaded"
        );
        self.selection = asset.full_range();
        self.asset = Some(asset);
        self.position_sec = 0.0;
        self.playing_since = None;
        self.state = EditorState::Loaded;
        Ok(())
    }

    pub fn play(&mut self) -> ConvertResult<()> {
        self.loaded("play")?;
        if self.state != EditorState::Playing {
            self.playing_since = Some(Instant::now());
            self.state = EditorState::Playing;
        }
        Ok(())
    }

    pub fn pause(&mut self) -> ConvertResult<()> {
        self.loaded("pause")?;
        self.position_sec = self.position_sec();
        self.playing_since = None;
        self.state = EditorState::Paused;
        Ok(())
    }

    /// Move the playhead; the target is clamped to `[0, duration]`.
    pub fn seek(&mut self, to_sec: f64) -> ConvertResult<()> {
        let duration = self.loaded("seek")?.duration_sec;
        let to = if to_sec.is_finite() { to_sec } else { 0.0 };
        self.position_sec = to.clamp(0.0, duration);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    /// Current playhead, advancing with wall time while playing.
    pub fn position_sec(&self) -> f64 {
        let elapsed = self
            .playing_since
            .map_or(0.0, |t| t.elapsed().as_secs_f64());
        (self.position_sec + elapsed).min(self.duration())
    }

    pub fn position_label(&self) -> String {
        format_clock(self.position_sec())
    }

    pub fn set_selection(&mut self, range: TimeRange) -> ConvertResult<()> {
        let duration = self.loaded("select")?.duration_sec;
        let range = range.require_non_empty()?;
        if range.end_sec > duration {
            return Err(ConvertError::validation(format!(
                "selection ends at {:.3}s but the asset is {duration:.3}s long",
                range.end_sec
            )));
        }
        self.selection = range;
        Ok(())
    }

    /// Move the start handle by `delta_sec`, staying at least one step before the end.
    pub fn nudge_start(&mut self, delta_sec: f64) -> ConvertResult<TimeRange> {
        self.loaded("trim")?;
        finite_step(delta_sec)?;
        let max = (self.selection.end_sec - NUDGE_STEP_SEC).max(0.0);
        self.selection.start_sec = (self.selection.start_sec + delta_sec).clamp(0.0, max);
        Ok(self.selection)
    }

    /// Move the end handle by `delta_sec`, staying at least one step after the start.
    pub fn nudge_end(&mut self, delta_sec: f64) -> ConvertResult<TimeRange> {
        let duration = self.loaded("trim")?.duration_sec;
        finite_step(delta_sec)?;
        let min = (self.selection.start_sec + NUDGE_STEP_SEC).min(duration);
        self.selection.end_sec = (self.selection.end_sec + delta_sec).clamp(min, duration);
        Ok(self.selection)
    }

    pub fn is_exporting(&self) -> bool {
        self.export.is_some()
    }

    /// Run `request` on a worker thread. Only one export may be in flight per session.
    pub fn start_export(
        &mut self,
        request: ConversionRequest,
        save_name: Option<String>,
    ) -> ConvertResult<()> {
        if self.export.is_some() {
            return Err(self.reject("start an export"));
        }
        let cancel = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let exporter = Arc::clone(&self.exporter);
        let library = self.library.clone();
        let token = cancel.clone();

        let worker = std::thread::spawn(move || {
            let outcome = run_export(
                exporter.as_ref(),
                library.as_deref(),
                &request,
                save_name,
                &token,
            );
            let _ = tx.send(outcome);
        });

        self.position_sec = self.position_sec();
        self.playing_since = None;
        self.export = Some(InFlight {
            cancel,
            rx,
            _worker: worker,
        });
        self.state = EditorState::Exporting;
        Ok(())
    }

    /// Non-blocking check; `None` while the export is still running or when none was started.
    pub fn poll_export(&mut self) -> Option<ConvertResult<ExportOutcome>> {
        let inflight = self.export.as_ref()?;
        let outcome = match inflight.rx.try_recv() {
            Ok(outcome) => outcome,
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => Err(worker_lost()),
        };
        Some(self.finish_export(outcome))
    }

    /// Block until the in-flight export finishes.
    pub fn wait_export(&mut self) -> ConvertResult<ExportOutcome> {
        let Some(inflight) = self.export.as_ref() else {
            return Err(self.reject("wait for an export"));
        };
        let outcome = inflight.rx.recv().unwrap_or_else(|_| Err(worker_lost()));
        self.finish_export(outcome)
    }

    /// Signal the in-flight export to stop. Returns `false` when nothing was running.
    pub fn cancel_export(&self) -> bool {
        match &self.export {
            Some(inflight) => {
                inflight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn finish_export(
        &mut self,
        outcome: ConvertResult<ExportOutcome>,
    ) -> ConvertResult<ExportOutcome> {
        self.export = None;
        self.state = match &outcome {
            Ok(_) => EditorState::Done,
            Err(e) => {
                tracing::warn!(error = %e, "export did not complete");
                EditorState::Failed
            }
        };
        outcome
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.cancel_export();
    }
}

fn finite_step(delta_sec: f64) -> ConvertResult<()> {
    if delta_sec.is_finite() {
        Ok(())
    } else {
        Err(ConvertError::validation(
            "trim nudge must be a finite number of seconds",
        ))
    }
}

fn worker_lost() -> ConvertError {
    ConvertError::export("export worker stopped without reporting a result")
}

fn run_export(
    exporter: &dyn Exporter,
    library: Option<&LibraryStore>,
    request: &ConversionRequest,
    save_name: Option<String>,
    cancel: &CancelToken,
) -> ConvertResult<ExportOutcome> {
    let result = exporter.export(request, cancel)?;
    let saved = match (save_name, library) {
        (Some(name), Some(library)) => {
            let seconds = result.display_duration().unwrap_or(0.0);
            let new = NewSavedFile::from_export(&result, Some(&name), format_clock(seconds))?;
            Some(library.add_saved_file(new)?)
        }
        (Some(name), None) => {
            tracing::warn!(%name, "no library attached; export not saved");
            None
        }
        (None, _) => None,
    };
    Ok(ExportOutcome { result, saved })
}

#[cfg(test)]
#[path = "../tests/unit/editor.rs"]
mod tests;
