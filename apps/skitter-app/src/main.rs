//! Skitter locomotion CLI.
//!
//! Provides three modes of operation:
//! - `walk`: Drive a legged body headless and print gait statistics
//! - `check-config`: Validate a locomotion TOML file
//! - `info`: Print workspace crate versions and defaults

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nalgebra::Vector2;
use tracing::info;
use tracing_subscriber::EnvFilter;

use skitter_core::prelude::*;
use skitter_gait::{Body, FrameReport, HexapodLayout};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Procedural multi-legged locomotion.
#[derive(Parser)]
#[command(name = "skitter", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a body headless and print per-second and summary statistics.
    Walk {
        /// Number of frames to run.
        #[arg(short = 'n', long, default_value_t = 600)]
        frames: u32,

        /// Frame rate; each frame advances by 1/hz seconds.
        #[arg(long, default_value_t = 60)]
        hz: u32,

        /// Forward movement command in [-1, 1].
        #[arg(long, default_value_t = 1.0, allow_hyphen_values = true)]
        forward: f32,

        /// Leftward movement command in [-1, 1].
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        strafe: f32,

        /// Turn command; positive turns counter-clockwise.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        turn: f32,

        /// Locomotion config TOML. Defaults are used when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Body layout TOML. Defaults to a hexapod.
        #[arg(short, long)]
        layout: Option<PathBuf>,

        /// Override the number of leg pairs.
        #[arg(long)]
        legs_per_side: Option<u32>,

        /// Plate terrain TOML. Flat ground at height zero when omitted.
        #[arg(short, long)]
        terrain: Option<PathBuf>,

        /// Print one line per simulated second.
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a locomotion config file.
    CheckConfig {
        /// Path to the TOML file.
        path: PathBuf,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Walk statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct WalkStats {
    frames: u64,
    started: usize,
    landed: usize,
    overrides: usize,
    slowed_frames: u64,
    max_stepping: usize,
    max_ik_error: f32,
}

impl WalkStats {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.started += report.started.len();
        self.landed += report.landed.len();
        self.overrides += report.overrides();
        if report.speed_scale < 1.0 {
            self.slowed_frames += 1;
        }
        self.max_stepping = self.max_stepping.max(report.stepping);
        self.max_ik_error = self.max_ik_error.max(report.max_ik_error);
    }
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_layout(path: Option<&Path>, legs_per_side: Option<u32>) -> Result<HexapodLayout, ConfigError> {
    let mut layout = match path {
        Some(path) => toml::from_str(&std::fs::read_to_string(path)?)?,
        None => HexapodLayout::default(),
    };
    if let Some(pairs) = legs_per_side {
        layout.legs_per_side = pairs;
    }
    Ok(layout)
}

fn load_ground(path: Option<&Path>) -> Result<Box<dyn GroundQuery>, ConfigError> {
    Ok(match path {
        Some(path) => {
            let plates = PlateGround::from_toml_str(&std::fs::read_to_string(path)?)?;
            info!(plates = plates.plates.len(), "loaded terrain");
            Box::new(plates)
        }
        None => Box::new(FlatGround::new(0.0)),
    })
}

#[allow(clippy::too_many_arguments)]
fn run_walk(
    frames: u32,
    hz: u32,
    command: MotionCommand,
    config: Option<&Path>,
    layout: Option<&Path>,
    legs_per_side: Option<u32>,
    terrain: Option<&Path>,
    verbose: bool,
) -> Result<(), SkitterError> {
    let config = match config {
        Some(path) => LocomotionConfig::from_file(path)?,
        None => LocomotionConfig::default(),
    };
    let layout = load_layout(layout, legs_per_side)?;
    let ground = load_ground(terrain)?;
    let mut body: Body = layout.assemble(config, ground.as_ref())?;

    let hz = hz.max(1);
    let dt = 1.0 / hz as f32;
    let start = body.pose().position;
    let mut stats = WalkStats::default();
    let mut second = WalkStats::default();

    println!(
        "walking {} legs for {frames} frames at {hz} Hz (move={:?}, turn={})",
        body.legs().len(),
        [command.movement.x, command.movement.y],
        command.turn
    );

    for _ in 0..frames {
        let report = body.frame(&command, dt, ground.as_ref());
        stats.record(&report);
        second.record(&report);

        if verbose && report.frame % u64::from(hz) == 0 {
            let pose = body.pose();
            println!(
                "t={:>5.1}s  pos=({:>7.2}, {:>7.2}, {:>5.2})  yaw={:>6.3}  landed={:>2}  overrides={}  max_ik_error={:.3}",
                report.frame as f32 * dt,
                pose.position.x,
                pose.position.y,
                pose.position.z,
                pose.yaw,
                second.landed,
                second.overrides,
                second.max_ik_error,
            );
            second = WalkStats::default();
        }
    }

    let travelled = (body.pose().position - start).xy().norm();
    println!();
    println!(
        "total: frames={}, steps started={}, steps landed={}, overrides={}",
        stats.frames, stats.started, stats.landed, stats.overrides
    );
    println!(
        "       distance={travelled:.2}, yaw={:.3}, max stepping={}, slowed frames={}, max ik error={:.3}",
        body.pose().yaw,
        stats.max_stepping,
        stats.slowed_frames,
        stats.max_ik_error
    );
    Ok(())
}

fn run_check_config(path: &Path) -> Result<(), SkitterError> {
    let config = LocomotionConfig::from_file(path)?;
    println!("{}: ok", path.display());
    println!(
        "  move_speed={}  turn_speed={}  max_distance={}",
        config.gait.move_speed, config.gait.turn_speed, config.gait.max_distance
    );
    println!(
        "  step_speed={}  landing_radius={}  landing={:?}",
        config.step_speed(),
        config.landing_radius(),
        config.step.landing
    );
    println!(
        "  ik: iterations={}  threshold={}",
        config.ik.iterations, config.ik.threshold
    );
    Ok(())
}

fn run_info() {
    println!("skitter v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  skitter-core  {}", env!("CARGO_PKG_VERSION"));
    println!("  skitter-ik    {}", env!("CARGO_PKG_VERSION"));
    println!("  skitter-gait  {}", env!("CARGO_PKG_VERSION"));
    println!();
    let config = LocomotionConfig::default();
    let layout = HexapodLayout::default();
    println!(
        "defaults: {} legs, step speed {}, landing radius {}, ik iterations {}",
        layout.legs_per_side * 2,
        config.step_speed(),
        config.landing_radius(),
        config.ik.iterations
    );
    println!("edition: 2024");
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Walk {
            frames,
            hz,
            forward,
            strafe,
            turn,
            config,
            layout,
            legs_per_side,
            terrain,
            verbose,
        }) => run_walk(
            frames,
            hz,
            MotionCommand::new(Vector2::new(forward, strafe), turn),
            config.as_deref(),
            layout.as_deref(),
            legs_per_side,
            terrain.as_deref(),
            verbose,
        ),
        Some(Commands::CheckConfig { path }) => run_check_config(&path),
        Some(Commands::Info) => {
            run_info();
            Ok(())
        }
        None => {
            // Default: a short forward walk
            run_walk(
                600,
                60,
                MotionCommand::forward(1.0),
                None,
                None,
                None,
                None,
                false,
            )
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
