use std::fs::{self, File};
use std::io;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::Serialize;

use crate::core::{Direction, Facing, Position, Snake, Target};
use crate::simulation::EpisodeState;

/// Immutable view of one tick, as consumed by an external recorder.
#[derive(Debug, Clone, Serialize)]
pub struct StepSnapshot {
    pub snake: Vec<Position>,
    pub facing: Facing,
    pub targets: Vec<Position>,
    pub done: bool,
    pub action: Option<Direction>,
}

#[derive(Resource, Default)]
pub struct StepHistory {
    pub steps: Vec<StepSnapshot>,
}

/// Appends a snapshot every tick, including the terminal one.
pub fn record_state(
    snakes: Query<&Snake>,
    targets: Query<&Position, With<Target>>,
    mut history: ResMut<StepHistory>,
    mut state: ResMut<EpisodeState>,
) {
    puffin::profile_function!();
    if let Ok(snake) = snakes.get_single() {
        history.steps.push(StepSnapshot {
            snake: snake.body.iter().copied().collect(),
            facing: snake.facing(),
            targets: targets.iter().copied().collect(),
            done: state.done,
            action: state.last_action,
        });
    }
    state.steps += 1;
}

/// Writes the whole episode as one JSON array, creating parent directories
/// as needed.
pub fn export_episode(history: &StepHistory, path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &history.steps).map_err(io::Error::from)?;
    tracing::info!(steps = history.steps.len(), path = %path.display(), "episode exported");
    Ok(())
}
