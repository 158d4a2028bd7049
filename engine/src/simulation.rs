use std::path::Path;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::Instant;

use bevy_ecs::prelude::*;
use ndarray::Array3;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tinyrand::{Seeded, Wyrand};

use crate::core::{
    check_termination, consume_targets, movement, random_position, resolve_actions, Brain,
    Direction, Position, Snake, Target,
};
use crate::recording::{self, StepHistory};
use crate::{minimap, sensory};

/// World and vision constants, fixed for the lifetime of an episode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Resource)]
pub struct SimulationConfig {
    pub columns: u32,
    pub rows: u32,
    pub cell_size: i32,
    pub vision_range: f32,
    pub fov_deg: f32,
    pub target_count: u32,
    pub starting_length: u32,
    pub minimap_size: usize,
    pub max_steps: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            columns: 20,
            rows: 20,
            cell_size: 1,
            vision_range: 10.0,
            fov_deg: 90.0,
            target_count: 10,
            starting_length: 3,
            minimap_size: 64,
            max_steps: 5000,
        }
    }
}

/// Every episode owns its own seeded source of randomness, so runs are
/// reproducible and episodes can execute in parallel without sharing state.
#[derive(Resource)]
pub struct RngResource {
    pub rng: Wyrand,
}

/// The action choice for one tick. An override from an external decision
/// maker wins over the snake's internal brain.
#[derive(Debug, Clone, Copy, Default)]
pub enum Action {
    #[default]
    Internal,
    Override(Direction),
}

#[derive(Resource, Default)]
pub struct PendingAction {
    pub action: Action,
}

#[derive(Resource, Default)]
pub struct EpisodeState {
    pub done: bool,
    pub steps: u32,
    pub consumed: bool,
    pub last_action: Option<Direction>,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    SimulationFinished {
        steps: u32,
        name: String,
        duration: u128,
    },
    TargetConsumed {
        step: u32,
    },
}

/// Shared handle letting systems emit engine events from inside the schedule.
#[derive(Resource, Clone)]
pub struct EngineEvents {
    pub events: Arc<Mutex<Sender<EngineEvent>>>,
}

pub struct Simulation {
    pub world: World,
    schedule: Schedule,
    pub name: String,
    engine_events: Sender<EngineEvent>,
}

impl Simulation {
    pub fn new(
        name: String,
        engine_events: Sender<EngineEvent>,
        config: SimulationConfig,
        seed: u64,
        brain: Box<dyn Brain>,
    ) -> Self {
        let mut world = World::new();
        let mut rng = Wyrand::seed(seed);
        let start = Position {
            x: config.columns as i32 / 2,
            y: config.rows as i32 / 2,
        };
        world.spawn(Snake::new(
            start,
            config.starting_length as usize,
            Direction::Right,
            config.vision_range,
            config.fov_deg.to_radians(),
            brain,
        ));
        for _ in 0..config.target_count {
            let position = random_position(&mut rng, config.columns, config.rows);
            world.spawn((Target::default(), position));
        }
        world.insert_resource(config);
        world.insert_resource(RngResource { rng });
        world.insert_resource(EpisodeState::default());
        world.insert_resource(PendingAction::default());
        world.insert_resource(StepHistory::default());
        world.insert_resource(EngineEvents {
            events: Arc::new(Mutex::new(engine_events.clone())),
        });
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                resolve_actions,
                movement,
                check_termination,
                consume_targets,
                recording::record_state,
            )
                .chain(),
        );
        Simulation {
            world,
            schedule,
            name,
            engine_events,
        }
    }

    /// One tick. A no-op once the episode has terminated.
    pub fn step(&mut self) {
        puffin::profile_function!();
        if self.is_done() {
            return;
        }
        self.world.resource_mut::<EpisodeState>().consumed = false;
        self.schedule.run(&mut self.world);
    }

    /// One tick with an explicit action for this tick only.
    pub fn step_with(&mut self, action: Action) {
        self.world.resource_mut::<PendingAction>().action = action;
        self.step();
    }

    pub fn is_done(&self) -> bool {
        self.world.resource::<EpisodeState>().done
    }

    /// Runs the episode to termination (or the step cap) using the snake's
    /// internal brain, and reports the result on the engine events channel.
    pub fn run(&mut self) -> EngineEvent {
        let start_time = Instant::now();
        let max_steps = self.world.resource::<SimulationConfig>().max_steps;
        while !self.is_done() && self.world.resource::<EpisodeState>().steps < max_steps {
            self.step();
        }
        let steps = self.world.resource::<EpisodeState>().steps;
        let duration = start_time.elapsed().as_millis();
        let result = EngineEvent::SimulationFinished {
            steps,
            name: self.name.clone(),
            duration,
        };
        let _ = self.engine_events.send(result.clone());
        result
    }

    /// On-demand partial-observability view of the current state: the flat
    /// feature vector and the egocentric minimap tensor.
    pub fn perception(&mut self) -> (Vec<f32>, Array3<f32>) {
        puffin::profile_function!();
        let config = *self.world.resource::<SimulationConfig>();
        let candidates: Vec<(Position, bool)> = self
            .world
            .query::<(&Target, &Position)>()
            .iter(&self.world)
            .map(|(target, position)| (*position, target.alive))
            .collect();
        let mut snake_query = self.world.query::<&Snake>();
        let snake = snake_query.single(&self.world);
        (
            sensory::flat_state(snake, &candidates, &config),
            minimap::extract_minimap(snake, &candidates, &config, config.minimap_size),
        )
    }

    pub fn export(&self, path: &Path) -> std::io::Result<()> {
        recording::export_episode(self.world.resource::<StepHistory>(), path)
    }
}
