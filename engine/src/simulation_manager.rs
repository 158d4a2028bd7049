use crate::simulation::Simulation;
use rayon::prelude::*;

/// Runs each episode to completion on its own worker. Every simulation owns
/// its world and RNG exclusively, so no synchronization is needed across
/// episodes.
pub fn simulate_batch(simulations: Vec<Simulation>) -> Vec<Simulation> {
    simulations
        .into_par_iter()
        .map(|mut simulation| {
            simulation.run();
            simulation
        })
        .collect()
}
