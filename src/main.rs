use clap::Parser;
use globe::{
    display::sequence_dir_name,
    scene::{self, SceneFile},
    PngSequence, RasterError, RefreshClock, SphereRasterizer, TextureSource,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "globe", about = "Render a spinning textured planet to a PNG sequence")]
struct Args {
    /// Scene file (JSON). Falls back to ./scene.json, then built-in defaults.
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Texture image, overrides the scene file.
    #[arg(short, long)]
    texture: Option<PathBuf>,

    /// Number of refresh ticks to render.
    #[arg(long)]
    frames: Option<u32>,

    /// Refresh rate of the simulated display.
    #[arg(long)]
    fps: Option<f64>,

    /// Random +/- jitter applied to each tick, in ms.
    #[arg(long, default_value_t = 0.0)]
    jitter: f64,

    #[arg(long)]
    tilt: Option<f64>,

    #[arg(long)]
    turn: Option<f64>,

    /// Output directory for the frames.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Resolve every pixel's intersection before the first frame.
    #[arg(long)]
    warm: bool,

    #[arg(short, long)]
    quiet: bool,
}

fn load_scene(path: Option<&Path>) -> globe::Result<SceneFile> {
    match path {
        Some(p) => scene::load(p),
        None if Path::new("scene.json").exists() => scene::load("scene.json"),
        None => Ok(SceneFile::default()),
    }
}

fn run(args: Args) -> globe::Result<()> {
    let file = load_scene(args.scene.as_deref())?;
    let mut params = file.params();
    if let Some(tilt) = args.tilt { params.tilt = tilt; }
    if let Some(turn) = args.turn { params.turn = turn; }

    let texture_path = args
        .texture
        .or(file.render.texture.clone())
        .ok_or_else(|| RasterError::TextureLoad("no texture given (scene render.texture or --texture)".into()))?;
    let frames = args.frames.unwrap_or(file.render.frames);
    let fps = args.fps.unwrap_or(file.render.fps);
    if !(fps.is_finite() && fps > 0.0) {
        return Err(RasterError::InvalidConfiguration(format!("fps must be positive, got {fps}")));
    }

    let mut planet = SphereRasterizer::new(
        file.render.width,
        file.render.height,
        TextureSource::Path(texture_path.clone()),
        params,
    )?
    .with_background(file.render.background);

    // ── dump scene info ───────────────────────────────────────────────────
    if !args.quiet {
        println!("=== SCENE ===");
        println!(" size      : {0}x{0}", planet.size());
        println!(" focal pt  : {:?}", params.focal_point);
        println!(" centre    : {:?}", params.sphere_center);
        println!(" radius    : {:.3}", params.radius);
        println!(" tilt/turn : {:.1}° / {:.1}°", params.tilt, params.turn);
        println!(" spin      : {} frames × {:.3} ms", params.frames_per_rotation, params.frame_duration_ms);
        println!(" texture   : {}", texture_path.display());
    }

    pollster::block_on(planet.load_texture())?;
    if args.warm {
        planet.warm_cache()?;
    }

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(sequence_dir_name(planet.size(), params.tilt, params.turn)));
    let mut surface = PngSequence::create(&out)?;

    let bar = if !args.quiet {
        let pb = ProgressBar::new(frames as u64);
        pb.set_style(ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {pos}/{len} frames | {elapsed_precise} | ETA: {eta}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()));
        Some(pb)
    } else {
        None
    };

    planet.start()?;
    for t in RefreshClock::new(0.0, fps, frames).with_jitter(args.jitter, rand::random()) {
        planet.on_tick(t, &mut surface)?;
        if let Some(b) = &bar { b.inc(1); }
    }
    planet.stop();

    if let Some(b) = bar {
        b.finish_with_message("Rendering complete");
    }
    tracing::info!(frames = surface.written(), dir = %surface.dir().display(), "sequence written");
    if !args.quiet {
        println!("Saved {} frames → {}", surface.written(), surface.dir().display());
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "globe=info".into()),
        )
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "render failed");
            ExitCode::FAILURE
        }
    }
}
