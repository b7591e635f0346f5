use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use gifloom::{
    DisposalMethod, EncodeThreading, EncoderConfig, FrameIndex, FrameSource, GifError, GifResult,
    RawFrame, Repeat, Rgb,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gifloom", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a sequence of images into an animated GIF.
    Encode(EncodeArgs),
    /// Print the default encoder configuration as JSON.
    Config,
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Output GIF path.
    #[arg(long)]
    out: PathBuf,

    /// Encoder configuration JSON; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Quantizer sample factor (1 = best, higher = faster).
    #[arg(long)]
    quality: Option<u32>,

    /// Delay after each frame in milliseconds.
    #[arg(long, conflicts_with = "fps")]
    delay_ms: Option<u32>,

    /// Playback rate; sets the per-frame delay.
    #[arg(long)]
    fps: Option<f32>,

    /// Looping: off, infinite, or a loop count.
    #[arg(long)]
    repeat: Option<Repeat>,

    /// Transparent color as RRGGBB.
    #[arg(long)]
    transparent: Option<Rgb>,

    /// Disposal method: none, keep, background or previous.
    #[arg(long)]
    dispose: Option<DisposalMethod>,

    /// Worker threads for frame preparation.
    #[arg(long)]
    threads: Option<usize>,

    /// Prepare frames on the calling thread only.
    #[arg(long)]
    sequential: bool,

    /// Input images, in frame order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

/// Frames decoded lazily from image files, so decoding runs on the worker pool.
struct ImageFiles {
    paths: Vec<PathBuf>,
}

impl FrameSource for ImageFiles {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn frame(&self, index: FrameIndex) -> GifResult<Cow<'_, RawFrame>> {
        let path = usize::try_from(index.0)
            .ok()
            .and_then(|i| self.paths.get(i))
            .ok_or_else(|| GifError::validation(format!("frame index {} out of range", index.0)))?;
        let frame = load_frame(path).map_err(GifError::Other)?;
        Ok(Cow::Owned(frame))
    }
}

fn load_frame(path: &Path) -> anyhow::Result<RawFrame> {
    let img = image::open(path)
        .with_context(|| format!("decode image '{}'", path.display()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(RawFrame::new(width, height, img.into_raw())?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Encode(args) => cmd_encode(args),
        Command::Config => cmd_config(),
    }
}

fn build_config(args: &EncodeArgs) -> anyhow::Result<EncoderConfig> {
    let mut cfg = match &args.config {
        Some(path) => EncoderConfig::from_json_path(path)?,
        None => EncoderConfig::default(),
    };
    if let Some(q) = args.quality {
        cfg.quality = q;
    }
    if let Some(ms) = args.delay_ms {
        cfg.delay = gifloom::delay_from_millis(ms);
    }
    if let Some(fps) = args.fps {
        cfg.delay = gifloom::delay_from_fps(fps)
            .with_context(|| format!("--fps must be a positive number, got {fps}"))?;
    }
    if let Some(repeat) = args.repeat {
        cfg.repeat = repeat;
    }
    if args.transparent.is_some() {
        cfg.transparent = args.transparent;
    }
    if args.dispose.is_some() {
        cfg.dispose = args.dispose;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args)?;
    let threading = EncodeThreading {
        parallel: !args.sequential,
        threads: args.threads,
        ..EncodeThreading::default()
    };
    let source = ImageFiles { paths: args.images };

    let stats = gifloom::encode_to_path(&source, &cfg, &threading, &args.out)
        .with_context(|| format!("encode '{}'", args.out.display()))?;

    tracing::info!(
        frames = stats.frames_written,
        image_data_bytes = stats.image_data_bytes,
        out = %args.out.display(),
        "wrote gif"
    );
    Ok(())
}

fn cmd_config() -> anyhow::Result<()> {
    println!("{}", EncoderConfig::default().to_json_string()?);
    Ok(())
}
