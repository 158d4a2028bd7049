use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use tinyrand::{Rand, RandRange, Wyrand};

use crate::sensory::visible_targets;
use crate::simulation::{
    Action, EngineEvent, EngineEvents, EpisodeState, PendingAction, RngResource, SimulationConfig,
};

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn delta_to(self, other: Position) -> (i32, i32) {
        (self.x - other.x, self.y - other.y)
    }

    pub fn length(self) -> f32 {
        (self.x as f32).hypot(self.y as f32)
    }

    pub fn distance_to(self, other: Position) -> f32 {
        ((self.x - other.x) as f32).hypot((self.y - other.y) as f32)
    }

    pub fn as_pair(self) -> (i32, i32) {
        (self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Bearing of this direction in radians, in (-pi, pi]. Right is 0,
    /// Down is pi/2, Up is -pi/2, Left is pi (y grows downward).
    pub fn angle(self) -> f32 {
        let (dx, dy) = self.delta();
        (dy as f32).atan2(dx as f32)
    }

    pub fn random(rng: &mut impl Rand) -> Self {
        match rng.next_range(0..4u32) {
            0 => Direction::Up,
            1 => Direction::Down,
            2 => Direction::Left,
            _ => Direction::Right,
        }
    }
}

/// Vision parameters of an agent, as consumed by the perception pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Facing {
    #[serde(rename = "facing_angle")]
    pub angle: f32,
    pub range: f32,
    pub fov: f32,
}

pub trait Brain: Send + Sync {
    fn decide(
        &self,
        head: Position,
        current: Direction,
        facing: Facing,
        visible_targets: &[Position],
        rng: &mut Wyrand,
    ) -> Direction;
}

pub struct RandomBrain;

impl Brain for RandomBrain {
    fn decide(
        &self,
        _head: Position,
        _current: Direction,
        _facing: Facing,
        _visible_targets: &[Position],
        rng: &mut Wyrand,
    ) -> Direction {
        Direction::random(rng)
    }
}

/// Heads for the nearest visible target, keeps course when nothing is in sight.
pub struct GreedyBrain;

impl Brain for GreedyBrain {
    fn decide(
        &self,
        head: Position,
        current: Direction,
        _facing: Facing,
        visible_targets: &[Position],
        _rng: &mut Wyrand,
    ) -> Direction {
        let Some(nearest) = visible_targets
            .iter()
            .copied()
            .min_by(|a, b| head.distance_to(*a).total_cmp(&head.distance_to(*b)))
        else {
            return current;
        };
        let dx = nearest.x - head.x;
        let dy = nearest.y - head.y;
        if dx.abs() >= dy.abs() && dx != 0 {
            if dx > 0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if dy != 0 {
            if dy > 0 {
                Direction::Down
            } else {
                Direction::Up
            }
        } else {
            current
        }
    }
}

// Snake owns its whole body as an ordered list of cells, head first.
#[derive(Component)]
pub struct Snake {
    pub body: VecDeque<Position>,
    pub direction: Direction,
    pub facing_angle: f32,
    pub vision_range: f32,
    pub fov: f32,
    pub alive: bool,
    pub grow_pending: bool,
    pub brain: Box<dyn Brain>,
}

impl Snake {
    /// Body starts at `start` and extends opposite to `direction`, so the
    /// first move never runs into the tail.
    pub fn new(
        start: Position,
        length: usize,
        direction: Direction,
        vision_range: f32,
        fov: f32,
        brain: Box<dyn Brain>,
    ) -> Self {
        let (dx, dy) = direction.delta();
        let body = (0..length.max(1))
            .map(|i| Position {
                x: start.x - dx * i as i32,
                y: start.y - dy * i as i32,
            })
            .collect();
        Snake {
            body,
            facing_angle: direction.angle(),
            direction,
            vision_range,
            fov,
            alive: true,
            grow_pending: false,
            brain,
        }
    }

    pub fn head(&self) -> Position {
        self.body[0]
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Advances the head one cell in the current direction. The tail is kept
    /// only when a growth is pending, so length changes by at most one.
    pub fn advance(&mut self) {
        let (dx, dy) = self.direction.delta();
        let head = self.head();
        self.facing_angle = self.direction.angle();
        self.body.push_front(Position {
            x: head.x + dx,
            y: head.y + dy,
        });
        if self.grow_pending {
            self.grow_pending = false;
        } else {
            self.body.pop_back();
        }
    }

    /// Growth is a single pending flag, not a counter: two calls before the
    /// next advance still add exactly one segment.
    pub fn grow(&mut self) {
        self.grow_pending = true;
    }

    pub fn is_self_collision(&self) -> bool {
        let head = self.head();
        self.body.iter().skip(1).any(|&segment| segment == head)
    }

    pub fn facing(&self) -> Facing {
        Facing {
            angle: self.facing_angle,
            range: self.vision_range,
            fov: self.fov,
        }
    }
}

#[derive(Component)]
pub struct Target {
    pub alive: bool,
}

impl Default for Target {
    fn default() -> Self {
        Target { alive: true }
    }
}

/// Uniform over the whole grid. Occupied cells are not excluded, so a target
/// may respawn on the snake or on another target.
pub fn random_position(rng: &mut impl Rand, columns: u32, rows: u32) -> Position {
    Position {
        x: rng.next_range(0..columns) as i32,
        y: rng.next_range(0..rows) as i32,
    }
}

pub fn out_of_bounds(head: Position, columns: u32, rows: u32) -> bool {
    head.x < 0 || head.y < 0 || head.x >= columns as i32 || head.y >= rows as i32
}

/// Resolves this tick's action: an external override wins, otherwise the
/// snake's own brain decides from what it currently sees.
pub fn resolve_actions(
    mut snakes: Query<&mut Snake>,
    targets: Query<(&Target, &Position)>,
    mut pending: ResMut<PendingAction>,
    mut state: ResMut<EpisodeState>,
    mut rng: ResMut<RngResource>,
) {
    puffin::profile_function!();
    let candidates: Vec<(Position, bool)> = targets
        .iter()
        .map(|(target, position)| (*position, target.alive))
        .collect();
    let action = std::mem::take(&mut pending.action);
    for mut snake in &mut snakes {
        let direction = match action {
            Action::Override(direction) => direction,
            Action::Internal => {
                let visible = visible_targets(snake.head(), snake.facing(), &candidates);
                snake.brain.decide(
                    snake.head(),
                    snake.direction,
                    snake.facing(),
                    &visible,
                    &mut rng.rng,
                )
            }
        };
        snake.set_direction(direction);
        state.last_action = Some(direction);
    }
}

pub fn movement(mut snakes: Query<&mut Snake>) {
    puffin::profile_function!();
    for mut snake in &mut snakes {
        snake.advance();
    }
}

/// Self-collision and out-of-bounds are terminal outcomes, not errors. The
/// transition to done is one-way.
pub fn check_termination(
    mut snakes: Query<&mut Snake>,
    config: Res<SimulationConfig>,
    mut state: ResMut<EpisodeState>,
) {
    puffin::profile_function!();
    for mut snake in &mut snakes {
        let head = snake.head();
        if snake.is_self_collision() || out_of_bounds(head, config.columns, config.rows) {
            snake.alive = false;
            state.done = true;
            tracing::info!(step = state.steps, "episode terminated");
        }
    }
}

pub fn consume_targets(
    mut snakes: Query<&mut Snake>,
    mut targets: Query<(&Target, &mut Position)>,
    config: Res<SimulationConfig>,
    mut state: ResMut<EpisodeState>,
    mut rng: ResMut<RngResource>,
    events: Res<EngineEvents>,
) {
    puffin::profile_function!();
    if state.done {
        return;
    }
    for mut snake in &mut snakes {
        let head = snake.head();
        for (target, mut position) in &mut targets {
            if target.alive && *position == head {
                snake.grow();
                *position = random_position(&mut rng.rng, config.columns, config.rows);
                state.consumed = true;
                let _ = events
                    .events
                    .lock()
                    .send(EngineEvent::TargetConsumed { step: state.steps });
            }
        }
    }
}
