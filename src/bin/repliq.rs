use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use repliq::{
    BackgroundSource, Canvas, CanvasBackend, ComposeConfig, CompositionRequest, Compositor,
    DisplayMode, FfmpegCliBackend, FfmpegMediaContext, OverlaySource, Pacing, Position, Shape,
};

#[derive(Parser, Debug)]
#[command(name = "repliq", version)]
struct Cli {
    /// Log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose an overlay clip over a scrolling background (requires `ffmpeg` on PATH).
    Compose(ComposeArgs),
    /// Write a synthesized website background as a PNG.
    Background(BackgroundArgs),
    /// Print the resolved overlay box as JSON.
    Geometry(GeometryArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    /// Frame-by-frame CPU canvas.
    Canvas,
    /// Single ffmpeg filter graph.
    Ffmpeg,
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Overlay video file.
    #[arg(long)]
    overlay: PathBuf,

    /// Background image; synthesized from `--label` when omitted.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Website label drawn on a synthesized background.
    #[arg(long)]
    label: Option<String>,

    /// small-bubble, big-bubble or full-screen.
    #[arg(long, default_value = "small-bubble")]
    mode: DisplayMode,

    /// bottom-left, bottom-right, top-left or top-right.
    #[arg(long, default_value = "bottom-right")]
    position: Position,

    /// circle, rounded or square.
    #[arg(long, default_value = "circle")]
    shape: Shape,

    /// Engine config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = BackendArg::Canvas)]
    backend: BackendArg,

    /// Render faster than real time (canvas backend).
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Output path; the extension should match the produced container.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct BackgroundArgs {
    #[arg(long)]
    label: Option<String>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 2000)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct GeometryArgs {
    #[arg(long, default_value = "small-bubble")]
    mode: DisplayMode,

    #[arg(long, default_value = "bottom-right")]
    position: Position,

    #[arg(long)]
    video_width: u32,

    #[arg(long)]
    video_height: u32,

    #[arg(long, default_value_t = 1280)]
    canvas_width: u32,

    #[arg(long, default_value_t = 720)]
    canvas_height: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Background(args) => cmd_background(args),
        Command::Geometry(args) => cmd_geometry(args),
    }
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => ComposeConfig::from_path(path)?,
        None => ComposeConfig::default(),
    }
    .with_env_overrides();

    let mut request = CompositionRequest::new(OverlaySource::Path(args.overlay))
        .with_display_mode(args.mode)
        .with_position(args.position)
        .with_shape(args.shape)
        .with_progress(|p| tracing::info!(percent = p, "progress"));
    if let Some(label) = args.label {
        request = request.with_label(label);
    }
    if let Some(bg) = args.background {
        request = request.with_background(BackgroundSource::Path(bg));
    }

    let result = match args.backend {
        BackendArg::Canvas => {
            let pacing = if args.offline {
                Pacing::Offline
            } else {
                Pacing::Realtime
            };
            Compositor::with_config(
                CanvasBackend::new(FfmpegMediaContext::new(pacing)),
                config,
            )
            .compose(request)?
        }
        BackendArg::Ffmpeg => {
            Compositor::with_config(FfmpegCliBackend::new(), config).compose(request)?
        }
    };

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &result.data)
        .with_context(|| format!("write output '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({}, {} frames, {:.2}s, audio: {})",
        args.out.display(),
        result.mime_type,
        result.frame_count,
        result.duration_secs,
        result.has_audio
    );
    Ok(())
}

fn cmd_background(args: BackgroundArgs) -> anyhow::Result<()> {
    let size = Canvas::new(args.width, args.height);
    let bg = repliq::synthesize_background(args.label.as_deref(), size);
    let mut straight = bg.rgba8_premul.as_ref().clone();
    unpremultiply_in_place(&mut straight);
    repliq::render::frame::save_rgba_png(&args.out, &straight, bg.width, bg.height)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_geometry(args: GeometryArgs) -> anyhow::Result<()> {
    let bx = repliq::resolve_overlay_box(
        args.mode,
        args.position,
        args.canvas_width,
        args.canvas_height,
        args.video_width,
        args.video_height,
    );
    println!("{}", serde_json::to_string_pretty(&bx)?);
    Ok(())
}

fn unpremultiply_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 || a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
        }
    }
}
