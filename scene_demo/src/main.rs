//! Headless scene demo
//!
//! Loads a pipeline configuration and a scene description, builds the scene's
//! GPU layout against the host collaborators and runs a number of frames,
//! logging what each frame wrote and drew.
//!
//! ```text
//! scene_demo [--config pipeline.toml] [--scene scene.ron] [--frames N]
//! ```

use std::path::PathBuf;
use clap::Parser;
use thiserror::Error;
use scene_pipeline::foundation::logging;
use scene_pipeline::prelude::*;

const DEFAULT_FRAMES: u64 = 8;

const BUILTIN_SCENE: &str = r#"(
    materials: [
        (name: "stone", flags: 1),
        (name: "brass", flags: 2),
    ],
    parameter_sets: [
        (id: "meadow", values: [0.25, 0.6, 0.2, 1.0]),
    ],
    cameras: [
        (position: (0.0, 6.0, 18.0), target: (0.0, 0.0, 0.0)),
    ],
    entities: [
        (name: "ground", graphics: Some((renderer: terrain, mesh: "quad", shared_parameters: Some("meadow")))),
        (
            name: "tower",
            parent: Some("ground"),
            transform: (position: (-3.0, 2.0, 0.0), scale: (1.0, 2.0, 1.0)),
            graphics: Some((renderer: static_mesh, mesh: "cube", material: Some("stone"))),
            collision: Some((min: (-1.0, -1.0, -1.0), max: (1.0, 1.0, 1.0))),
        ),
        (name: "rotor", parent: Some("tower"), transform: (position: (0.0, 1.5, 0.0))),
        (
            name: "blade",
            parent: Some("rotor"),
            transform: (position: (1.5, 0.0, 0.0), scale: (1.0, 0.1, 0.1)),
            graphics: Some((renderer: static_mesh, mesh: "cube", material: Some("brass"))),
        ),
        (name: "pond", transform: (position: (3.0, 0.1, 2.0)), graphics: Some((renderer: water, mesh: "quad"))),
        (name: "puddle", transform: (position: (5.0, 0.1, -4.0)), graphics: Some((renderer: water, mesh: "quad"))),
        (name: "sparks", transform: (position: (0.0, 1.0, 4.0)), graphics: Some((renderer: particle, mesh: "quad"))),
        (name: "lamp", transform: (position: (0.0, 8.0, 0.0)), graphics: Some((renderer: light, mesh: "cube", parameters: Some([1.0, 0.9, 0.7, 20.0])))),
    ],
)"#;

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Run a scene headlessly against the host GPU collaborators
#[derive(Debug, Parser)]
#[command(name = "scene_demo", version)]
struct Options {
    /// Pipeline configuration (.toml or .ron)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene description (.toml or .ron); the built-in scene when omitted
    #[arg(long)]
    scene: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = DEFAULT_FRAMES)]
    frames: u64,
}

/// Spins an entity about +Y
struct Spin {
    radians_per_second: f32,
}

impl Behavior for Spin {
    fn update(&mut self, transform: &mut Transform, context: &UpdateContext<'_>) {
        transform.axis = Vec3::y();
        transform.angle = context.elapsed * self.radians_per_second;
    }
}

fn main() {
    if let Err(error) = run() {
        log::error!("scene_demo failed: {error}");
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), DemoError> {
    let options = Options::parse();

    let config = match &options.config {
        Some(path) => PipelineConfig::load_from_file(path)?,
        None => PipelineConfig::default(),
    };
    logging::init_with_level(&config.log_level);

    let description = match &options.scene {
        Some(path) => SceneDescription::load_from_file(path)?,
        None => SceneDescription::load_from_str(BUILTIN_SCENE, ConfigFormat::Ron)?,
    };

    let mut scene = Scene::new(config)?;
    scene.load_description(&description)?;
    let rotors: Vec<EntityId> = scene
        .graph()
        .depth_first()
        .into_iter()
        .filter_map(|node| scene.graph().entity(node))
        .filter(|entity| entity.name == "rotor")
        .map(Entity::id)
        .collect();
    for id in rotors {
        if let Some(entity) = scene.entity_mut(id) {
            entity.set_behavior(Spin { radians_per_second: 1.5 });
        }
    }

    let mut meshes = MeshLibrary::with_builtin_meshes();
    let mut allocator = HostAllocator::new();
    let mut bindings = HostBindings::new();
    scene.build_graphics(&mut meshes)?;
    scene.allocate_gpu_buffers(&mut allocator)?;
    let set = scene.create_bindings(&mut bindings)?;

    let camera_count = scene.cameras().len() as u32;
    for frame in 0..options.frames {
        let elapsed = frame as f32 / 60.0;
        let stats = scene.render_frame(frame, elapsed, &mut allocator)?;

        let mut recorder = RecordingDrawRecorder::new();
        let mut draws = 0;
        for camera in 0..camera_count {
            for renderer in RendererType::RENDERABLE {
                draws += record_draws(&scene, renderer, frame, camera, set, &mut recorder)?;
            }
        }
        log::info!(
            "Frame {}: {} instances written, {} draw commands, {} draws recorded",
            frame,
            stats.instances_written,
            stats.draw_commands,
            draws
        );
    }

    scene.release_gpu_buffers(&mut allocator);
    log::info!("Demo finished after {} frames", options.frames);
    Ok(())
}
