use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use clap::{Parser, Subcommand};
use timed_canvas_core::{
    CanvasError, Editor, EditorConfig, ManualCadence, MediaKind, MediaSource, ObjectId,
    RecordingSurface, Result, TimeWindow,
};
use tracing_subscriber::EnvFilter;

type CliEditor = Editor<RecordingSurface, ManualCadence>;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            media,
            windows,
            select,
            realtime,
            config,
        } => run_play(&media, &windows, select, realtime, config.as_deref()),
        Commands::Layout { media, config } => run_layout(&media, config.as_deref()),
    }
}

fn run_play(
    media: &[MediaArg],
    windows: &[WindowArg],
    select: Option<usize>,
    realtime: bool,
    config: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let mut editor = CliEditor::new(&config, RecordingSurface::new(), ManualCadence::new());
    let ids = upload_all(&mut editor, media)?;

    for arg in windows {
        editor.select(Some(object_at(&ids, arg.index)?));
        editor.retime_selection(arg.window.start(), arg.window.end())?;
    }

    let active = match select {
        Some(index) => Some(object_at(&ids, index)?),
        None => ids.last().copied(),
    };
    editor.select(active);

    editor.play()?;
    tracing::info!(bound = editor.engine().bound(), realtime, "playing");
    print_frame(&editor, &ids);

    while let Some((timer, period)) = editor.engine().cadence().next_due() {
        if realtime {
            std::thread::sleep(period);
        }
        editor.tick(timer);
        print_frame(&editor, &ids);
    }

    editor.dispose();
    Ok(())
}

fn run_layout(media: &[MediaArg], config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    let mut editor = CliEditor::new(&config, RecordingSurface::new(), ManualCadence::new());
    upload_all(&mut editor, media)?;

    let objects = editor.store().objects_as_list();
    println!("{}", serde_json::to_string_pretty(&objects)?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            EditorConfig::load(path)
        }
        None => Ok(EditorConfig::default()),
    }
}

fn upload_all(editor: &mut CliEditor, media: &[MediaArg]) -> Result<Vec<ObjectId>> {
    media
        .iter()
        .map(|arg| arg.load().map(|source| editor.upload(source)))
        .collect()
}

/// `PATH` or `PATH=WIDTHxHEIGHT`. Images without a size are probed when
/// loaded; videos always need one.
#[derive(Debug, Clone)]
struct MediaArg {
    path: PathBuf,
    kind: MediaKind,
    size: Option<(f64, f64)>,
}

impl FromStr for MediaArg {
    type Err = CanvasError;

    fn from_str(raw: &str) -> Result<Self> {
        let (path, size) = match raw.rsplit_once('=') {
            Some((path, size)) => (PathBuf::from(path), Some(parse_size(size)?)),
            None => (PathBuf::from(raw), None),
        };
        let kind = MediaKind::from_path(&path)?;
        if kind == MediaKind::Video && size.is_none() {
            return Err(CanvasError::msg(format!(
                "video `{raw}` needs an explicit size, e.g. `{raw}=1920x1080`"
            )));
        }
        Ok(Self { path, kind, size })
    }
}

impl MediaArg {
    fn load(&self) -> Result<MediaSource> {
        let (width, height) = match self.size {
            Some(size) => size,
            None => {
                let (width, height) = image::image_dimensions(&self.path)
                    .map_err(|err| CanvasError::msg(format!("{}: {err}", self.path.display())))?;
                (f64::from(width), f64::from(height))
            }
        };
        MediaSource::new(self.path.display().to_string(), self.kind, width, height)
    }
}

fn parse_size(raw: &str) -> Result<(f64, f64)> {
    let invalid = || CanvasError::msg(format!("expected WIDTHxHEIGHT, got `{raw}`"));
    let (width, height) = raw.split_once('x').ok_or_else(invalid)?;
    let width = width.trim().parse().map_err(|_| invalid())?;
    let height = height.trim().parse().map_err(|_| invalid())?;
    Ok((width, height))
}

/// `INDEX=START..END`, where `INDEX` counts uploads from 1.
#[derive(Debug, Clone)]
struct WindowArg {
    index: usize,
    window: TimeWindow,
}

impl FromStr for WindowArg {
    type Err = CanvasError;

    fn from_str(raw: &str) -> Result<Self> {
        let (index, window) = raw.split_once('=').ok_or_else(|| {
            CanvasError::InvalidTimeWindow(format!("expected INDEX=START..END, got `{raw}`"))
        })?;
        let index = index
            .trim()
            .parse()
            .map_err(|_| CanvasError::msg(format!("`{index}` is not an object index")))?;
        Ok(Self {
            index,
            window: window.parse()?,
        })
    }
}

fn object_at(ids: &[ObjectId], index: usize) -> Result<ObjectId> {
    index
        .checked_sub(1)
        .and_then(|index| ids.get(index))
        .copied()
        .ok_or_else(|| CanvasError::msg(format!("no uploaded object number {index}")))
}

fn print_frame(editor: &CliEditor, ids: &[ObjectId]) {
    let states: Vec<String> = ids
        .iter()
        .filter_map(|id| editor.store().get(*id))
        .map(|object| {
            let mark = if object.visible() { "on" } else { "off" };
            format!("{}:{mark}", object.id())
        })
        .collect();
    println!("{:02}s  {}", editor.clock(), states.join(" "));
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Timeline-driven media canvas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place media on the canvas and play the timeline, one line per second.
    Play {
        /// Media files as `PATH` or `PATH=WIDTHxHEIGHT` (required for video).
        #[arg(required = true)]
        media: Vec<MediaArg>,
        /// Visibility window for an upload, e.g. `2=3..5`.
        #[arg(short, long = "window")]
        windows: Vec<WindowArg>,
        /// Upload whose end time bounds playback (defaults to the last one).
        #[arg(short, long)]
        select: Option<usize>,
        /// Wait for the tick interval between seconds instead of running
        /// straight through.
        #[arg(long)]
        realtime: bool,
        /// JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print the default placement of each upload as JSON.
    Layout {
        #[arg(required = true)]
        media: Vec<MediaArg>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sizes_and_windows() {
        assert_eq!(parse_size("1920x1080").unwrap(), (1920.0, 1080.0));
        assert!(parse_size("1920").is_err());

        let arg: WindowArg = "2=3..5".parse().unwrap();
        assert_eq!(arg.index, 2);
        assert_eq!((arg.window.start(), arg.window.end()), (3.0, 5.0));
        assert!("3..5".parse::<WindowArg>().is_err());
    }

    #[test]
    fn videos_need_an_explicit_size() {
        let source = "clip.mp4=640x360".parse::<MediaArg>().unwrap().load().unwrap();
        assert_eq!(source.kind, MediaKind::Video);
        assert_eq!((source.width, source.height), (640.0, 360.0));
        assert!("clip.mp4".parse::<MediaArg>().is_err());
        assert!("notes.txt=10x10".parse::<MediaArg>().is_err());
    }

    #[test]
    fn bad_arguments_are_usage_errors() {
        let err = Cli::try_parse_from(["timed-canvas", "play", "a.png=10x10", "--window", "1=x..5"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let err = Cli::try_parse_from(["timed-canvas", "layout", "clip.mp4"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let cli = Cli::try_parse_from(["timed-canvas", "play", "a.png=10x10", "-w", "1=2..4"]).unwrap();
        match cli.command {
            Commands::Play { media, windows, .. } => {
                assert_eq!(media[0].size, Some((10.0, 10.0)));
                assert_eq!(windows[0].index, 1);
            }
            Commands::Layout { .. } => panic!("expected play"),
        }
    }

    #[test]
    fn object_numbers_start_at_one() {
        let mut editor = CliEditor::new(
            &EditorConfig::default(),
            RecordingSurface::new(),
            ManualCadence::new(),
        );
        let media = vec!["a.png=10x10".parse::<MediaArg>().unwrap()];
        let ids = upload_all(&mut editor, &media).unwrap();

        assert_eq!(object_at(&ids, 1).unwrap(), ids[0]);
        assert!(object_at(&ids, 0).is_err());
        assert!(object_at(&ids, 2).is_err());
    }
}
