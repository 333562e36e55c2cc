use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quadraster::config::RenderConfig;
use quadraster::scene::{checkerboard_texture, random_triangles};
use quadraster::{
    depth_clear_value, render_triangles, CommandQueue, Filter, ImageF32, ImageRgbaU8, Material, ThreadPool,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => RenderConfig::load_toml(&path)?,
        None => RenderConfig::default(),
    };
    let output = PathBuf::from(args.next().unwrap_or_else(|| "quadraster.png".to_owned()));

    let pool = ThreadPool::new(config.threads.count).context("failed to start worker threads")?;
    let camera = config.build_camera().context("invalid camera configuration")?;
    let (width, height) = (config.target.width, config.target.height);

    let mut color = ImageRgbaU8::new(width, height)?;
    color.fill(config.target.clear_color);
    let depth = if config.target.depth {
        let mut depth = ImageF32::new(width, height)?;
        depth.fill(depth_clear_value(camera.is_perspective()));
        Some(depth)
    } else {
        None
    };

    let texture = match config.scene.texture_size {
        0 => None,
        size => Some(checkerboard_texture(size, config.scene.mipmaps).context("failed to build texture")?),
    };
    let mut rng = StdRng::seed_from_u64(config.scene.seed);
    let scene = random_triangles(&mut rng, config.scene.triangles, &camera, config.scene.alpha);
    let material = Material {
        diffuse: texture.as_ref(),
        light: None,
        filter: if config.scene.alpha { Filter::Alpha } else { Filter::Solid },
    };

    let start = Instant::now();
    let mut queue = CommandQueue::with_capacity(scene.triangle_count());
    let metrics = render_triangles(Some(&mut queue), &color, depth.as_ref(), &camera, &scene.mesh(), &material);
    let queued = start.elapsed();
    let jobs = config.threads.job_count(pool.thread_count(), height);
    queue.execute_on(&pool, color.rect(), jobs);
    info!(?queued, total = ?start.elapsed(), commands = queue.len(), jobs, "scene rendered");
    info!("{metrics}");

    color.save_png(&output).with_context(|| format!("failed to write {output:?}"))?;
    info!(path = ?output, "wrote color buffer");
    if let Some(depth) = &depth {
        let path = depth_path(&output);
        let (near, far) = if camera.is_perspective() {
            (1.0 / camera.far, 1.0 / camera.near)
        } else {
            (camera.far, camera.near)
        };
        depth
            .to_luma_image(near, far)
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("failed to write {path:?}"))?;
        info!(path = ?path, "wrote depth buffer");
    }
    Ok(())
}

/// `out.png` becomes `out_depth.png`.
fn depth_path(output: &Path) -> PathBuf {
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("quadraster");
    output.with_file_name(format!("{stem}_depth.png"))
}
