mod scenes;

use anyhow::{Context, Result};
use clap::Parser;
use raster_core::logging::{LogConfig, LogLevel};
use raster_core::types::Frame;
use raster_core::{CullMode, PipelineConfig, Rasterizer, RenderStats, ShadingMode};
use scenes::{Scene, SceneKind};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Shading {
    VertexColor,
    Lambert,
    Normals,
}

impl From<Shading> for ShadingMode {
    fn from(s: Shading) -> Self {
        match s {
            Shading::VertexColor => ShadingMode::VertexColor,
            Shading::Lambert => ShadingMode::Lambert,
            Shading::Normals => ShadingMode::Normals,
        }
    }
}

#[derive(Parser)]
struct Args {
    /// Built-in scene to render
    #[arg(value_enum, default_value_t = SceneKind::Cube)]
    scene: SceneKind,

    #[arg(long, default_value_t = 256)]
    width: u32,

    #[arg(long, default_value_t = 256)]
    height: u32,

    /// Number of frames to render; the last one is written out
    #[arg(long, default_value_t = 1)]
    frames: u64,

    /// Pipeline config (JSON); missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the configured shading mode
    #[arg(long, value_enum)]
    shading: Option<Shading>,

    /// Discard triangles facing away from the camera
    #[arg(long, default_value_t = false)]
    cull_back: bool,

    /// Worker threads per stage (default: all cores)
    #[arg(long)]
    workers: Option<usize>,

    /// PNG file for the last frame
    #[arg(long, default_value = "frame.png")]
    output: PathBuf,

    /// Write per-frame stats to this file as JSON
    #[arg(long)]
    stats: Option<PathBuf>,

    /// Core log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Also write core logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(shading) = args.shading {
        config.shading = shading.into();
    }
    if args.cull_back {
        config.cull_mode = CullMode::Back;
    }
    if args.workers.is_some() {
        config.workers = args.workers;
    }
    Ok(config)
}

fn write_png(path: &Path, rgba: &[u8], width: u32, height: u32) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgba)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let level = LogLevel::from_str(&args.log_level)
        .with_context(|| format!("unknown log level {:?}", args.log_level))?;
    let log_config = LogConfig::global();
    log_config.set_global_level(level);
    if let Some(path) = &args.log_file {
        log_config
            .set_log_file(path.clone())
            .with_context(|| format!("opening log file {}", path.display()))?;
    }

    let config = load_config(&args)?;
    log::info!(
        "Rendering {:?} at {}x{} for {} frame(s), {:?} shading, {} workers",
        args.scene,
        args.width,
        args.height,
        args.frames,
        config.shading,
        config.worker_count()
    );

    let scene = Scene::build(args.scene);
    let mut rasterizer = Rasterizer::new(config);
    rasterizer.initialize(
        args.width,
        args.height,
        scene.vertex_count(),
        scene.triangle_count(),
    )?;

    let mut frame = Frame::new(args.width, args.height);
    let mut all_stats: Vec<RenderStats> = Vec::new();
    for index in 0..args.frames {
        let camera = scenes::camera_for(args.scene, index);
        let stats = rasterizer.rasterize_core(&mut frame, index, scene.flat(), &camera)?;
        log::debug!(
            "Frame {}: {} fragments, {} triangles culled",
            stats.frame,
            stats.fragments,
            stats.culled.total()
        );
        all_stats.push(stats);
    }

    let mut rgba = vec![0u8; args.width as usize * args.height as usize * 4];
    rasterizer.emit_rgba8(&mut rgba, args.width, args.height)?;
    write_png(&args.output, &rgba, args.width, args.height)?;
    log::info!("Wrote {}", args.output.display());

    if let Some(path) = &args.stats {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &all_stats)?;
        log::info!("Wrote stats to {}", path.display());
    }

    rasterizer.teardown();
    log_config.clear_log_file();
    Ok(())
}
