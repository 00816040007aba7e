use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;

use traffic_grid::simulation::{EngineConfig, MapGrid, Simulation, StopMode, TrafficEngine};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StopArg {
    /// Stop when every vehicle has collected all its points
    All,
    /// Stop when one vehicle has collected all its points
    One,
}

impl From<StopArg> for StopMode {
    fn from(arg: StopArg) -> Self {
        match arg {
            StopArg::All => StopMode::AllFinished,
            StopArg::One => StopMode::OneFinished,
        }
    }
}

#[derive(Parser)]
#[command(name = "traffic_grid")]
#[command(about = "Headless grid traffic simulation")]
struct Cli {
    /// Map file to load instead of the bundled sample map
    #[arg(long)]
    map: Option<PathBuf>,

    /// Seed for every random choice
    #[arg(long, default_value = "2137")]
    seed: u64,

    /// Maximum number of ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u64,

    /// Number of vehicles to spawn
    #[arg(long, default_value = "50")]
    vehicles: usize,

    /// Points each vehicle has to collect
    #[arg(long, default_value = "10")]
    points: usize,

    /// Fraction of eligible intersections with a traffic light
    #[arg(long, default_value = "0.4")]
    light_fraction: f64,

    /// Ticks between traffic light switches
    #[arg(long, default_value = "10")]
    light_interval: u32,

    /// When the session counts as finished
    #[arg(long, value_enum, default_value = "all")]
    stop_mode: StopArg,

    /// Ticks between progress reports
    #[arg(long, default_value = "100")]
    report_every: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let grid = match &cli.map {
        Some(path) => MapGrid::from_file(path)
            .with_context(|| format!("Failed to load map {}", path.display()))?,
        None => MapGrid::sample().context("Bundled sample map is invalid")?,
    };

    let config = EngineConfig {
        random_seed: cli.seed,
        traffic_light_fraction: cli.light_fraction,
        light_switch_interval: cli.light_interval,
        vehicle_count: cli.vehicles,
        points_per_vehicle: cli.points,
    };
    let engine = TrafficEngine::new(&grid, config).context("Failed to build engine")?;
    let mut simulation = Simulation::with_random_drivers(engine, cli.stop_mode.into());

    run_headless(&mut simulation, cli.ticks, cli.report_every.max(1));
    Ok(())
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(simulation: &mut Simulation, ticks: u64, report_every: u64) {
    info!("Running traffic simulation in headless mode...");
    print_summary(simulation);

    while simulation.tick() < ticks && !simulation.is_finished() {
        let chunk = report_every.min(ticks - simulation.tick());
        simulation.run(chunk);
        info!("--- After tick {} ---", simulation.tick());
        print_summary(simulation);
    }

    info!("=== SIMULATION COMPLETE ===");
    let stats = simulation.stats();
    info!("Total ticks: {}", stats.ticks);
    info!("Total moves: {}", stats.moves);
    info!("Points collected: {}", stats.points_collected);
    info!("Move rate: {:.1}%", stats.move_rate());
    info!("Finished: {}", simulation.is_finished());
}

fn print_summary(simulation: &Simulation) {
    let engine = simulation.engine();
    let topology = engine.topology();
    info!(
        "Map: {}x{}, Nodes: {}, Roads: {}, Lights: {}, Vehicles: {}",
        topology.width(),
        topology.height(),
        topology.node_count(),
        topology.road_count(),
        engine.traffic_lights().count(),
        engine.vehicle_count()
    );
    let outstanding: usize = engine.points().values().map(Vec::len).sum();
    let finished = engine.finished_vehicles();
    info!(
        "Outstanding points: {}, Finished vehicles: {}/{}",
        outstanding,
        finished.values().filter(|done| **done).count(),
        finished.len()
    );
    info!("{}", simulation.stats().summary());
}
