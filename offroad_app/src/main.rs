//! Offroad content checker
//!
//! Loads the configuration, the built-in shaders and a scene through the
//! asset cache, then renders a number of frames against the recording device
//! and reports what each pass did. Any broken mesh, shader or texture fails
//! the run with the offending path.
//!
//! ```text
//! offroad_check [config.toml|config.ron] [scene] [frames]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use offroad_engine::foundation::logging;
use offroad_engine::foundation::math::{from_column_major, Vec3};
use offroad_engine::prelude::*;
use offroad_engine::core::ConfigError;
use offroad_engine::scene::TransformSource;
use thiserror::Error;

/// Simulated frame time for the headless run
const FRAME_DELTA: Duration = Duration::from_millis(16);

const DEFAULT_FRAMES: u32 = 120;

#[derive(Error, Debug)]
enum AppError {
    #[error("Usage: {0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

struct Args {
    config: Option<PathBuf>,
    scene: Option<PathBuf>,
    frames: u32,
}

impl Args {
    fn parse() -> Result<Self, AppError> {
        let mut args = std::env::args().skip(1);
        let config = args.next().map(PathBuf::from);
        let scene = args.next().map(PathBuf::from);
        let frames = match args.next() {
            Some(n) => n
                .parse()
                .map_err(|_| AppError::Usage(format!("frame count '{}' is not a number", n)))?,
            None => DEFAULT_FRAMES,
        };
        Ok(Self { config, scene, frames })
    }
}

struct CheckApp {
    config: ApplicationConfig,
    device: RecordingDevice,
    cache: AssetCache,
    world: KinematicWorld,
}

impl CheckApp {
    fn new(config: ApplicationConfig) -> Self {
        Self {
            cache: AssetCache::new(config.assets.mesh_version_policy),
            config,
            device: RecordingDevice::new(),
            world: KinematicWorld::new(),
        }
    }

    fn run(&mut self, scene_path: PathBuf, frames: u32) -> Result<(), AppError> {
        let mut pipeline = FramePipeline::new(
            &mut self.device,
            &mut self.cache,
            self.config.renderer.clone(),
            self.config.assets.plain_shader_path(),
            self.config.assets.blur_shader_path(),
        )?;

        let result = self.render_scene(&mut pipeline, scene_path, frames);

        pipeline.release(&mut self.device);
        result
    }

    fn render_scene(&mut self, pipeline: &mut FramePipeline, scene_path: PathBuf, frames: u32) -> Result<(), AppError> {
        log::info!("Loading scene {}", scene_path.display());
        let scene = load_scene(&scene_path, &mut self.cache, &mut self.device, Some(&mut self.world))?;
        log::info!(
            "Scene has {} drawables ({} ghosts, {} skipped, {} incomplete)",
            scene.draw_list.len(),
            scene.ghosts,
            scene.skipped_objects,
            scene.draw_list.incomplete_count()
        );

        // Follow the first physics-driven object, like the vehicle camera does
        let tracked = scene.draw_list.iter().find_map(|d| match d.transform_source() {
            TransformSource::RigidBody(body) => Some((d.name.clone(), body)),
            TransformSource::Static(_) => None,
        });
        if let Some((name, _)) = &tracked {
            log::info!("Chase camera tracking {}", name);
        }

        let mut camera = pipeline.camera(Vec3::new(0.0, 0.0, 10.0));
        let mut chase = ChaseCamera::new(Vec3::x());
        let mut timer = Timer::new();
        let mut totals = FrameStats::default();

        for _ in 0..frames {
            pipeline.advance(&mut self.world, FRAME_DELTA);

            let mut focus = Vec3::zeros();
            if let Some((_, body)) = &tracked {
                if let Some(matrix) = self.world.world_transform(*body) {
                    let model = from_column_major(&matrix);
                    chase.update(&mut camera, &model, FRAME_DELTA.as_secs_f32() * 1000.0);
                    focus = model.fixed_view::<3, 1>(0, 3).into_owned();
                }
            }

            let input = FrameInput::from_camera(&camera, focus);
            let stats = pipeline.render_frame(&mut self.device, &self.cache, &scene.draw_list, Some(&self.world), input)?;
            accumulate(&mut totals, &stats);

            timer.tick();
            self.device.clear_commands();
        }

        let cache_stats = self.cache.stats();
        log::info!(
            "Rendered {} frames ({:.0} fps): {} draws, {} shadow casters, {} culled, {} incomplete, {} unplaced, {} passes",
            timer.frame_count(),
            timer.fps(),
            totals.objects_drawn,
            totals.shadow_casters,
            totals.objects_culled,
            totals.incomplete_skipped,
            totals.unplaced_skipped,
            totals.passes
        );
        log::info!(
            "Asset loads: {} meshes, {} shaders, {} textures, {} cache hits",
            cache_stats.mesh_loads,
            cache_stats.shader_loads,
            cache_stats.texture_loads,
            cache_stats.hits
        );
        Ok(())
    }

    fn cleanup(&mut self) {
        self.cache.release_all(&mut self.device);
        let leaked = self.device.live_object_count();
        if leaked > 0 {
            log::warn!("{} device objects still alive after cleanup", leaked);
        }
        if self.device.invalid_deletes() > 0 {
            log::error!("{} invalid deletes during cleanup", self.device.invalid_deletes());
        }
    }
}

fn accumulate(totals: &mut FrameStats, frame: &FrameStats) {
    totals.objects_drawn += frame.objects_drawn;
    totals.shadow_casters += frame.shadow_casters;
    totals.objects_culled += frame.objects_culled;
    totals.incomplete_skipped += frame.incomplete_skipped;
    totals.unplaced_skipped += frame.unplaced_skipped;
    totals.passes += frame.passes;
    totals.debug_lines += frame.debug_lines;
}

fn run() -> Result<(), AppError> {
    let args = Args::parse()?;
    let config = match &args.config {
        Some(path) => ApplicationConfig::load_from_file(path)?,
        None => ApplicationConfig::default(),
    };
    config.validate()?;

    logging::init_with_level(&config.engine.log_level);
    log::info!("Starting Offroad content check");
    if let Some(path) = &args.config {
        log::info!("Using configuration {}", path.display());
    }

    let scene_path = args
        .scene
        .unwrap_or_else(|| config.assets.content_dir.join("level.scene"));

    let mut app = CheckApp::new(config);
    let result = app.run(scene_path, args.frames);
    app.cleanup();
    result
}

fn main() {
    if let Err(e) = run() {
        log::error!("{}", e);
        eprintln!("offroad_check: {}", e);
        std::process::exit(1);
    }
}
