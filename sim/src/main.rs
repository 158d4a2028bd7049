mod config;

use std::path::{Path, PathBuf};

use gridsnake_engine::core::{Brain, GreedyBrain, RandomBrain};
use gridsnake_engine::simulation::{EngineEvent, Simulation};
use gridsnake_engine::simulation_manager::simulate_batch;
use tracing::Level;
use tracing_subscriber::fmt;

fn make_brain(policy: &str) -> Box<dyn Brain> {
    match policy {
        "random" => Box::new(RandomBrain),
        _ => Box::new(GreedyBrain),
    }
}

fn main() {
    fmt().with_max_level(Level::INFO).init();

    let mut args = std::env::args().skip(1);
    let episodes: usize = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(1);
    let seed: u64 = args.next().and_then(|arg| arg.parse().ok()).unwrap_or(42);
    let out_dir = args.next().unwrap_or_else(|| "data".to_string());
    let policy = args.next().unwrap_or_else(|| "greedy".to_string());

    let simulation_config = config::load_config();
    if !Path::new("config.toml").exists() {
        config::save_config(&simulation_config);
    }

    let (events_sender, events_receiver) = std::sync::mpsc::channel();
    let simulations: Vec<Simulation> = (0..episodes)
        .map(|i| {
            Simulation::new(
                format!("episode_{:03}", i + 1),
                events_sender.clone(),
                simulation_config,
                seed + i as u64,
                make_brain(&policy),
            )
        })
        .collect();

    tracing::info!(episodes, seed, policy = %policy, "running batch");
    let finished = simulate_batch(simulations);

    for simulation in &finished {
        let path = PathBuf::from(&out_dir).join(format!("{}.json", simulation.name));
        if let Err(error) = simulation.export(&path) {
            tracing::error!(%error, name = %simulation.name, "failed to export episode");
        }
    }

    drop(events_sender);
    let mut consumed = 0u32;
    for event in events_receiver.try_iter() {
        match event {
            EngineEvent::SimulationFinished {
                steps,
                name,
                duration,
            } => {
                tracing::info!(name = %name, steps, duration_ms = duration as u64, "simulation finished");
            }
            EngineEvent::TargetConsumed { .. } => consumed += 1,
        }
    }
    tracing::info!(consumed, "targets consumed across all episodes");
}
