use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use avconvert::{
    AudioEffect, ConversionRequest, Converter, EditorSession, ExportPreset, GifOptions,
    ImageEdits, LibraryStore, MediaFormat, MediaKind, Operation, Preferences, RegionRequest,
    Resolution, Settings, TimeRange, format_clock,
};
use clap::{Args, Parser, Subcommand};
use kurbo::{Rect, Vec2};

#[derive(Parser, Debug)]
#[command(name = "avconvert", version, about = "Convert, trim and edit audio, video and images")]
struct Cli {
    /// Settings JSON; every field is optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print duration, tracks and sizes of a media file.
    Probe { input: PathBuf },
    /// Convert audio to another audio format, or video to another container.
    Convert {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long)]
        to: MediaFormat,
    },
    /// Extract the audio track of a video into an .m4a.
    ExtractAudio(ExportArgs),
    /// Apply a sound effect (reverb, echo, bass, cut) to the audio track.
    Effect {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long)]
        effect: AudioEffect,
        #[arg(long, default_value = "m4a")]
        to: MediaFormat,
    },
    /// Render a black 1080x1920 video under an audio file.
    ToVideo {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long, default_value = "mp4")]
        to: MediaFormat,
    },
    /// Keep only [start, end) of a file.
    Trim {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long)]
        start: f64,
        #[arg(long)]
        end: f64,
        #[arg(long)]
        preset: Option<ExportPreset>,
    },
    /// Re-encode smaller: optional cut, target size and frame rate.
    Compress {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long, requires = "end")]
        start: Option<f64>,
        #[arg(long, requires = "start")]
        end: Option<f64>,
        #[arg(long)]
        resolution: Option<Resolution>,
        #[arg(long)]
        fps: Option<u32>,
    },
    /// Draw an image over every frame.
    Watermark {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long)]
        image: PathBuf,
        /// Horizontal offset of the watermark centre from the frame centre.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dx: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        dy: f64,
        #[arg(long, default_value = "80x80")]
        size: Resolution,
    },
    /// Blur watermark regions: corner regions by count, or explicit rectangles.
    Erase {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long, conflicts_with = "rect")]
        count: Option<u8>,
        /// `x,y,w,h` in display pixels; repeatable.
        #[arg(long, value_parser = parse_rect)]
        rect: Vec<Rect>,
    },
    /// Lay a still image over the whole clip.
    Cover {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long)]
        image: PathBuf,
    },
    /// Animated GIF from a video range or a still image.
    Gif {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        #[arg(long)]
        end: f64,
        #[arg(long)]
        fps: Option<u32>,
        #[arg(long)]
        resolution: Option<Resolution>,
        /// 0 loops forever.
        #[arg(long, default_value_t = 0)]
        loops: u16,
    },
    /// Convert a still image (jpg, png, webp, gif, pdf), optionally mirrored, flipped or
    /// cropped to a centred square.
    Image {
        #[command(flatten)]
        common: ExportArgs,
        #[arg(long)]
        to: MediaFormat,
        #[arg(long, conflicts_with_all = ["mirror", "flip", "crop_square"])]
        resize: Option<Resolution>,
        /// Swap left and right.
        #[arg(long)]
        mirror: bool,
        /// Turn upside down.
        #[arg(long)]
        flip: bool,
        /// Keep the largest centred square.
        #[arg(long)]
        crop_square: bool,
    },
    /// Print the amplitude envelope as JSON.
    Waveform {
        input: PathBuf,
        #[arg(long)]
        samples: Option<usize>,
    },
    /// Saved files.
    #[command(subcommand)]
    Library(LibraryCommand),
    /// Playlists of saved files.
    #[command(subcommand)]
    Playlists(PlaylistCommand),
}

#[derive(Args, Debug)]
struct ExportArgs {
    input: PathBuf,
    /// Save the result into the library under this name.
    #[arg(long)]
    save: Option<String>,
}

#[derive(Subcommand, Debug)]
enum LibraryCommand {
    List,
    Delete { id: uuid::Uuid },
}

#[derive(Subcommand, Debug)]
enum PlaylistCommand {
    List,
    Create { name: String },
    Add { playlist: String, id: uuid::Uuid },
    Show { playlist: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // A subscriber may already be installed when embedded; keep going without ours.
    let _ = avconvert::logging::init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("load settings")?;
    match cli.cmd {
        Command::Probe { input } => cmd_probe(&settings, &input),
        Command::Waveform { input, samples } => {
            let samples = samples.unwrap_or(settings.waveform_samples);
            let env = avconvert::waveform::amplitudes(&settings.ffmpeg_bin, &input, samples)
                .with_context(|| format!("waveform of '{}'", input.display()))?;
            println!("{}", serde_json::to_string(&env)?);
            Ok(())
        }
        Command::Library(cmd) => cmd_library(&settings, cmd),
        Command::Playlists(cmd) => cmd_playlists(&settings, cmd),
        cmd => {
            let (common, op) = export_operation(&settings, cmd)?;
            run_export(&settings, ConversionRequest::new(common.input, op), common.save)
        }
    }
}

fn export_operation(settings: &Settings, cmd: Command) -> anyhow::Result<(ExportArgs, Operation)> {
    let out = match cmd {
        Command::Convert { common, to } => {
            let op = match to.kind() {
                MediaKind::Audio => Operation::ConvertAudio { format: to },
                MediaKind::Video => Operation::ConvertVideo { format: to },
                MediaKind::Image => anyhow::bail!("use `avconvert image` for image targets"),
            };
            (common, op)
        }
        Command::ExtractAudio(common) => (common, Operation::ExtractAudio),
        Command::Effect { common, effect, to } => {
            (common, Operation::AudioEffect { effect, format: to })
        }
        Command::ToVideo { common, to } => (common, Operation::AudioToVideo { format: to }),
        Command::Trim {
            common,
            start,
            end,
            preset,
        } => (
            common,
            Operation::Trim {
                range: TimeRange::new(start, end)?,
                preset,
            },
        ),
        Command::Compress {
            common,
            start,
            end,
            resolution,
            fps,
        } => {
            let range = match (start, end) {
                (Some(s), Some(e)) => Some(TimeRange::new(s, e)?),
                _ => None,
            };
            (
                common,
                Operation::Compress {
                    range,
                    resolution,
                    fps,
                },
            )
        }
        Command::Watermark {
            common,
            image,
            dx,
            dy,
            size,
        } => (
            common,
            Operation::Watermark {
                image,
                offset: Vec2::new(dx, dy),
                size: size.size(),
            },
        ),
        Command::Erase {
            common,
            count,
            rect,
        } => {
            let regions = match count {
                Some(n) => RegionRequest::Corners(n),
                None if rect.is_empty() => RegionRequest::Corners(1),
                None => RegionRequest::Rects(rect),
            };
            (common, Operation::EraseWatermarks { regions })
        }
        Command::Cover { common, image } => (common, Operation::SetCover { image }),
        Command::Gif {
            common,
            start,
            end,
            fps,
            resolution,
            loops,
        } => {
            let opts = GifOptions {
                range: TimeRange::new(start, end)?,
                fps: fps.unwrap_or(settings.gif_fps),
                resolution,
                loop_count: loops,
            };
            let op = if MediaFormat::kind_of_path(&common.input) == Some(MediaKind::Image) {
                Operation::GifFromImage(opts)
            } else {
                Operation::GifFromVideo(opts)
            };
            (common, op)
        }
        Command::Image {
            common,
            to,
            resize,
            mirror,
            flip,
            crop_square,
        } => {
            let edits = ImageEdits {
                mirror,
                flip,
                crop_square,
            };
            let op = if edits.is_empty() {
                Operation::ConvertImage { format: to, resize }
            } else {
                Operation::EditImage { format: to, edits }
            };
            (common, op)
        }
        other => anyhow::bail!("{other:?} is not an export command"),
    };
    Ok(out)
}

fn run_export(
    settings: &Settings,
    request: ConversionRequest,
    save: Option<String>,
) -> anyhow::Result<()> {
    let converter = Converter::new(settings.clone());
    let mut session = EditorSession::new(Arc::new(converter));
    if save.is_some() {
        let library = LibraryStore::open(&settings.library_path)
            .with_context(|| format!("open library '{}'", settings.library_path.display()))?;
        session = session.with_library(Arc::new(library));
    }

    let op = request.operation.name();
    session.start_export(request, save)?;
    let outcome = session
        .wait_export()
        .with_context(|| format!("{op} failed"))?;

    if let Some(saved) = &outcome.saved {
        eprintln!("saved {} as '{}'", saved.id, saved.file_name);
    }
    eprintln!("wrote {}", outcome.result.path.display());
    println!("{}", outcome.result.path.display());
    Ok(())
}

fn cmd_probe(settings: &Settings, input: &Path) -> anyhow::Result<()> {
    let asset = Converter::new(settings.clone())
        .probe(input)
        .with_context(|| format!("probe '{}'", input.display()))?;
    println!("path:     {}", asset.path.display());
    println!(
        "duration: {} ({:.3}s)",
        format_clock(asset.duration_sec),
        asset.duration_sec
    );
    if let Some(v) = &asset.video {
        let fps = v.fps.map(|f| f.to_string()).unwrap_or_else(|| "?".into());
        println!(
            "video:    {}x{} rotation {} fps {fps}",
            v.width, v.height, v.rotation
        );
        if let Some(d) = asset.display_size() {
            println!("display:  {d}");
        }
    }
    if let Some(a) = &asset.audio {
        println!("audio:    {} Hz, {} ch", a.sample_rate, a.channels);
    }
    Ok(())
}

fn cmd_library(settings: &Settings, cmd: LibraryCommand) -> anyhow::Result<()> {
    let library = LibraryStore::open(&settings.library_path)
        .with_context(|| format!("open library '{}'", settings.library_path.display()))?;
    match cmd {
        LibraryCommand::List => {
            for f in library.fetch_saved_files() {
                println!(
                    "{}\t{}\t{}\t{} KB\t{}",
                    f.id, f.kind, f.duration, f.file_size_kb, f.file_name
                );
            }
        }
        LibraryCommand::Delete { id } => {
            if !library.delete_saved_file(id)? {
                anyhow::bail!("no saved file with id {id}");
            }
            eprintln!("deleted {id}");
        }
    }
    Ok(())
}

fn cmd_playlists(settings: &Settings, cmd: PlaylistCommand) -> anyhow::Result<()> {
    let prefs = Preferences::open(&settings.prefs_path)
        .with_context(|| format!("open preferences '{}'", settings.prefs_path.display()))?;
    match cmd {
        PlaylistCommand::List => {
            for name in prefs.playlists() {
                println!("{name}");
            }
        }
        PlaylistCommand::Create { name } => {
            if !prefs.create_playlist(&name)? {
                eprintln!("playlist '{name}' already exists");
            }
        }
        PlaylistCommand::Add { playlist, id } => {
            prefs.add_file(&playlist, &id.to_string())?;
        }
        PlaylistCommand::Show { playlist } => {
            for id in prefs.file_ids(&playlist)? {
                println!("{id}");
            }
        }
    }
    Ok(())
}

fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("rect '{s}': {e}"))?;
    let &[x, y, w, h] = parts.as_slice() else {
        return Err(format!("rect '{s}' must be x,y,w,h"));
    };
    if !(w > 0.0 && h > 0.0) {
        return Err(format!("rect '{s}' needs a positive width and height"));
    }
    Ok(Rect::new(x, y, x + w, y + h))
}
