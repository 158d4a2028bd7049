use std::collections::VecDeque;
use std::sync::mpsc::channel;

use bevy_ecs::prelude::With;
use gridsnake_engine::core::{Direction, GreedyBrain, Position, RandomBrain, Snake, Target};
use gridsnake_engine::recording::StepHistory;
use gridsnake_engine::simulation::{
    Action, EngineEvent, EpisodeState, Simulation, SimulationConfig,
};
use gridsnake_engine::simulation_manager::simulate_batch;
use gridsnake_engine::test_utils::ScriptedBrain;

fn place_single_target(sim: &mut Simulation, position: Position) {
    let mut query = sim.world.query_filtered::<&mut Position, With<Target>>();
    for mut target_position in query.iter_mut(&mut sim.world) {
        *target_position = position;
    }
}

#[test]
fn test_snake_eats_target_and_grows() {
    let config = SimulationConfig {
        target_count: 1,
        starting_length: 1,
        ..Default::default()
    };
    let (tx, _rx) = channel();
    let mut sim = Simulation::new("eat".to_string(), tx, config, 42, Box::new(RandomBrain));
    place_single_target(&mut sim, Position { x: 15, y: 10 });

    for _ in 0..5 {
        sim.step_with(Action::Override(Direction::Right));
    }

    {
        let mut query = sim.world.query::<&Snake>();
        let snake = query.single(&sim.world);
        assert_eq!(snake.head(), Position { x: 15, y: 10 });
        assert_eq!(snake.body.len(), 1);
        assert!(snake.grow_pending, "consumption defers growth to the next move");
        assert!(snake.alive);
    }
    let state = sim.world.resource::<EpisodeState>();
    assert!(state.consumed);
    assert!(!state.done);

    // the consumed target respawned somewhere on the grid
    {
        let mut query = sim.world.query_filtered::<&Position, With<Target>>();
        let respawned = query.single(&sim.world);
        assert!(respawned.x >= 0 && respawned.x < 20);
        assert!(respawned.y >= 0 && respawned.y < 20);
    }

    // growth materializes on the move after consumption
    sim.step_with(Action::Override(Direction::Right));
    let mut query = sim.world.query::<&Snake>();
    let snake = query.single(&sim.world);
    assert_eq!(snake.body.len(), 2);
    assert_eq!(snake.head(), Position { x: 16, y: 10 });

    let history = sim.world.resource::<StepHistory>();
    assert_eq!(history.steps.len(), 6);
    assert_eq!(history.steps[4].action, Some(Direction::Right));
}

#[test]
fn test_out_of_bounds_terminates_and_step_becomes_noop() {
    let config = SimulationConfig::default();
    let (tx, _rx) = channel();
    let mut sim = Simulation::new("oob".to_string(), tx, config, 7, Box::new(RandomBrain));
    {
        let mut query = sim.world.query::<&mut Snake>();
        let mut snake = query.single_mut(&mut sim.world);
        snake.body = VecDeque::from([Position { x: 0, y: 5 }]);
    }

    sim.step_with(Action::Override(Direction::Left));

    {
        let mut query = sim.world.query::<&Snake>();
        let snake = query.single(&sim.world);
        assert_eq!(snake.head(), Position { x: -1, y: 5 });
        assert!(!snake.alive);
    }
    assert!(sim.is_done());
    assert_eq!(sim.world.resource::<EpisodeState>().steps, 1);
    {
        let history = sim.world.resource::<StepHistory>();
        assert_eq!(history.steps.len(), 1);
        assert!(history.steps[0].done, "terminal tick is still recorded");
    }

    // terminated episodes ignore further steps, even with overrides
    sim.step();
    sim.step_with(Action::Override(Direction::Right));
    assert_eq!(sim.world.resource::<EpisodeState>().steps, 1);
    assert_eq!(sim.world.resource::<StepHistory>().steps.len(), 1);
}

#[test]
fn test_internal_brain_drives_episode_when_no_override() {
    let config = SimulationConfig {
        target_count: 0,
        ..Default::default()
    };
    let script = ScriptedBrain::new([Direction::Down, Direction::Down, Direction::Right]);
    let (tx, _rx) = channel();
    let mut sim = Simulation::new("scripted".to_string(), tx, config, 1, Box::new(script));

    for _ in 0..3 {
        sim.step();
    }

    let mut query = sim.world.query::<&Snake>();
    let snake = query.single(&sim.world);
    assert_eq!(snake.head(), Position { x: 11, y: 12 });

    let history = sim.world.resource::<StepHistory>();
    let actions: Vec<_> = history.steps.iter().map(|step| step.action).collect();
    assert_eq!(
        actions,
        vec![
            Some(Direction::Down),
            Some(Direction::Down),
            Some(Direction::Right),
        ]
    );
}

#[test]
fn test_identical_seeds_give_identical_episodes() {
    let config = SimulationConfig::default();
    let (tx, _rx) = channel();
    let mut first = Simulation::new("a".to_string(), tx.clone(), config, 99, Box::new(RandomBrain));
    let mut second = Simulation::new("b".to_string(), tx, config, 99, Box::new(RandomBrain));

    for _ in 0..50 {
        first.step();
        second.step();
    }

    let first_json =
        serde_json::to_string(&first.world.resource::<StepHistory>().steps).unwrap();
    let second_json =
        serde_json::to_string(&second.world.resource::<StepHistory>().steps).unwrap();
    assert_eq!(first_json, second_json);

    let (first_flat, first_map) = first.perception();
    let (second_flat, second_map) = second.perception();
    assert_eq!(first_flat, second_flat);
    assert_eq!(first_map, second_map);
    assert_eq!(first_flat.len(), 52);
    assert_eq!(first_map.shape(), &[4, 64, 64]);
}

#[test]
fn test_batch_runs_episodes_in_parallel() {
    let config = SimulationConfig {
        max_steps: 30,
        ..Default::default()
    };
    let (tx, rx) = channel();
    let simulations: Vec<Simulation> = (0..3)
        .map(|i| {
            Simulation::new(
                format!("episode_{i}"),
                tx.clone(),
                config,
                100 + i as u64,
                Box::new(GreedyBrain),
            )
        })
        .collect();

    let finished = simulate_batch(simulations);
    assert_eq!(finished.len(), 3);
    for sim in &finished {
        let history = sim.world.resource::<StepHistory>();
        assert!(!history.steps.is_empty());
        assert!(history.steps.len() <= 30);
    }

    drop(tx);
    let finished_events: Vec<String> = rx
        .try_iter()
        .filter_map(|event| match event {
            EngineEvent::SimulationFinished { name, .. } => Some(name),
            EngineEvent::TargetConsumed { .. } => None,
        })
        .collect();
    assert_eq!(finished_events.len(), 3);
    for i in 0..3 {
        assert!(finished_events.contains(&format!("episode_{i}")));
    }
}
