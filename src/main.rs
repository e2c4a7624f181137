use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use helios_rt::{render, scene::Scene, stats};

#[derive(Parser, Debug)]
#[command(name = "helios")]
#[command(about = "Offline CPU ray tracer", long_about = None)]
struct Args {
    /// Scene description file
    scene: PathBuf,

    /// Override the worker count from the scene file
    #[arg(long)]
    workers: Option<usize>,

    /// Write the image to this path instead of the scene's image_name
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut scene = Scene::load(&args.scene)
        .with_context(|| format!("failed to load scene {}", args.scene.display()))?;
    if let Some(workers) = args.workers {
        scene.options.n_workers = workers;
    }

    let framebuffer = render::render(&scene);

    let output = args.output.unwrap_or_else(|| {
        args.scene
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&scene.options.image_name)
    });
    render::write_image(&framebuffer, scene.options.width, scene.options.height, &output)
        .with_context(|| format!("failed to write image {}", output.display()))?;
    tracing::info!(path = %output.display(), "image written");

    stats::report();
    Ok(())
}
