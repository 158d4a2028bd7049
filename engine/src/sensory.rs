use std::f32::consts::{PI, TAU};

use crate::core::{Facing, Position, Snake};
use crate::simulation::SimulationConfig;

/// Cap on how many visible targets contribute to the flat feature vector.
pub const MAX_VISIBLE_TARGETS: usize = 5;

/// Width of the per-target directional indicator block.
pub const DIRECTION_FEATURES: usize = 8;

/// Signed angular difference `a - b`, wrapped into [-pi, pi).
pub fn angle_delta(a: f32, b: f32) -> f32 {
    (a - b + PI).rem_euclid(TAU) - PI
}

/// The one range-and-cone predicate shared by the object filter and the
/// per-pixel rasterizer, so the two sites can never diverge. Boundaries are
/// inclusive on both the range and the half-angle. A point exactly at the
/// origin has no bearing and counts as visible.
pub fn within_vision(ax: f32, ay: f32, facing: Facing, x: f32, y: f32) -> bool {
    let dx = x - ax;
    let dy = y - ay;
    let dist = dx.hypot(dy);
    if dist > facing.range {
        return false;
    }
    if dist == 0.0 {
        return true;
    }
    let delta = angle_delta(dy.atan2(dx), facing.angle);
    delta.abs() <= facing.fov / 2.0
}

/// Order-preserving cone filter over live candidates.
pub fn visible_targets(
    head: Position,
    facing: Facing,
    candidates: &[(Position, bool)],
) -> Vec<Position> {
    candidates
        .iter()
        .filter(|(position, alive)| {
            *alive
                && within_vision(
                    head.x as f32,
                    head.y as f32,
                    facing,
                    position.x as f32,
                    position.y as f32,
                )
        })
        .map(|(position, _)| *position)
        .collect()
}

/// Eight-way indicator of where `target` lies relative to `head`, ordered
/// [up-right, right, down-right, down, down-left, left, up-left, up].
/// All zero when the target sits exactly on the head.
pub fn relative_direction(head: Position, target: Position) -> [f32; DIRECTION_FEATURES] {
    let dx = target.x - head.x;
    let dy = target.y - head.y;
    let flags = [
        dx > 0 && dy < 0,
        dx > 0 && dy == 0,
        dx > 0 && dy > 0,
        dx == 0 && dy > 0,
        dx < 0 && dy > 0,
        dx < 0 && dy == 0,
        dx < 0 && dy < 0,
        dx == 0 && dy < 0,
    ];
    flags.map(|flag| flag as u8 as f32)
}

/// Boundary-proximity flags in [up, down, right, left] order.
pub fn danger_flags(head: Position, config: &SimulationConfig) -> [bool; 4] {
    let cell = config.cell_size;
    [
        head.y <= cell,
        head.y >= config.rows as i32 - cell,
        head.x >= config.columns as i32 - cell,
        head.x <= cell,
    ]
}

/// Flat numeric feature vector for an external decision maker: 12 self
/// features followed by directional indicators for the nearest visible
/// targets, zero-padded up to `MAX_VISIBLE_TARGETS`.
pub fn flat_state(
    snake: &Snake,
    candidates: &[(Position, bool)],
    config: &SimulationConfig,
) -> Vec<f32> {
    let head = snake.head();
    let facing = snake.facing();

    let mut visible = visible_targets(head, facing, candidates);
    visible.sort_by(|a, b| head.distance_to(*a).total_cmp(&head.distance_to(*b)));

    let mut directions = Vec::with_capacity(MAX_VISIBLE_TARGETS * DIRECTION_FEATURES);
    for target in visible.iter().take(MAX_VISIBLE_TARGETS) {
        directions.extend(relative_direction(head, *target));
    }
    directions.resize(MAX_VISIBLE_TARGETS * DIRECTION_FEATURES, 0.0);

    let first_segment = snake.body.get(1).copied().unwrap_or(head);
    let [up, down, right, left] = danger_flags(head, config);

    let mut state = vec![
        head.x as f32 / config.columns as f32,
        head.y as f32 / config.rows as f32,
        (head.x - first_segment.x) as f32,
        (head.y - first_segment.y) as f32,
        facing.angle,
        facing.range / config.columns as f32,
        facing.fov / TAU,
        up as u8 as f32,
        down as u8 as f32,
        right as u8 as f32,
        left as u8 as f32,
        snake.alive as u8 as f32,
    ];
    state.extend(directions);
    state
}
