#![forbid(unsafe_code)]

pub mod assets;
pub mod config;
pub mod convert;
pub mod editor;
pub mod effects;
pub mod encode;
pub mod format;
pub mod foundation;
pub mod library;
pub mod logging;
pub mod request;
pub mod waveform;

pub use assets::probe::MediaAsset;
pub use config::Settings;
pub use convert::{Converter, Exporter};
pub use editor::{EditorSession, EditorState, ExportOutcome};
pub use encode::session::CancelToken;
pub use format::{MediaFormat, MediaKind};
pub use foundation::core::{Fps, Resolution, TimeRange, format_clock};
pub use foundation::error::{ConvertError, ConvertResult};
pub use library::prefs::Preferences;
pub use library::store::{LibraryStore, SavedFile};
pub use request::{
    AudioEffect, ConversionRequest, ExportPreset, ExportResult, GifOptions, ImageEdits, Operation,
    RegionRequest,
};
