use ndarray::Array3;

use crate::core::{Facing, Position, Snake};
use crate::sensory::within_vision;
use crate::simulation::SimulationConfig;

pub const CHANNEL_AGENT: usize = 0;
pub const CHANNEL_TARGET: usize = 1;
pub const CHANNEL_WALL: usize = 2;
pub const CHANNEL_FACING: usize = 3;
pub const CHANNELS: usize = 4;

/// Integer line rasterization, symmetric in all eight octants. Both
/// endpoints are included.
pub fn bresenham_line(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<(i32, i32)> {
    let mut points = Vec::new();
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        points.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}

fn to_grid(head: Position, vision_range: f32, cell: f32, x: f32, y: f32) -> (i32, i32) {
    let gx = ((x - head.x as f32 + vision_range) / cell).round() as i32;
    let gy = ((y - head.y as f32 + vision_range) / cell).round() as i32;
    (gx, gy)
}

// Writes are silently dropped outside the output grid.
fn plot(tensor: &mut Array3<f32>, channel: usize, grid_size: usize, gx: i32, gy: i32) {
    if gx >= 0 && gx < grid_size as i32 && gy >= 0 && gy < grid_size as i32 {
        tensor[[channel, gy as usize, gx as usize]] = 1.0;
    }
}

/// Samples one boundary edge point by point and connects consecutive visible
/// samples with line segments in pixel space, so coordinate quantization
/// cannot leave gaps in the wall channel.
fn draw_border(
    tensor: &mut Array3<f32>,
    grid_size: usize,
    head: Position,
    facing: Facing,
    cell: f32,
    points: impl Iterator<Item = (i32, i32)>,
) {
    let mut prev: Option<(i32, i32)> = None;
    for (x, y) in points {
        if !within_vision(head.x as f32, head.y as f32, facing, x as f32, y as f32) {
            continue;
        }
        let (gx, gy) = to_grid(head, facing.range, cell, x as f32, y as f32);
        if gx < 0 || gx >= grid_size as i32 || gy < 0 || gy >= grid_size as i32 {
            continue;
        }
        if let Some((px, py)) = prev {
            for (lx, ly) in bresenham_line(px, py, gx, gy) {
                plot(tensor, CHANNEL_WALL, grid_size, lx, ly);
            }
        }
        plot(tensor, CHANNEL_WALL, grid_size, gx, gy);
        prev = Some((gx, gy));
    }
}

/// Rasterizes the world into an egocentric `CHANNELS x grid_size x grid_size`
/// tensor. The head sits at the exact center of the agent channel; everything
/// else is gated per point by the shared vision cone predicate. The tensor is
/// rebuilt from scratch on every call and is a pure function of its inputs.
pub fn extract_minimap(
    snake: &Snake,
    targets: &[(Position, bool)],
    config: &SimulationConfig,
    grid_size: usize,
) -> Array3<f32> {
    puffin::profile_function!();
    let mut tensor = Array3::<f32>::zeros((CHANNELS, grid_size, grid_size));

    let head = snake.head();
    let facing = snake.facing();
    let ax = head.x as f32;
    let ay = head.y as f32;
    // world units per output pixel
    let cell = (2.0 * facing.range) / grid_size as f32;

    let center = grid_size / 2;
    tensor[[CHANNEL_AGENT, center, center]] = 1.0;

    for segment in snake.body.iter().skip(1) {
        if within_vision(ax, ay, facing, segment.x as f32, segment.y as f32) {
            let (gx, gy) = to_grid(head, facing.range, cell, segment.x as f32, segment.y as f32);
            plot(&mut tensor, CHANNEL_AGENT, grid_size, gx, gy);
        }
    }

    for (position, alive) in targets {
        if !alive {
            continue;
        }
        if within_vision(ax, ay, facing, position.x as f32, position.y as f32) {
            let (gx, gy) = to_grid(head, facing.range, cell, position.x as f32, position.y as f32);
            plot(&mut tensor, CHANNEL_TARGET, grid_size, gx, gy);
        }
    }

    let columns = config.columns as i32;
    let rows = config.rows as i32;
    draw_border(&mut tensor, grid_size, head, facing, cell, (0..columns).map(|x| (x, 0)));
    draw_border(&mut tensor, grid_size, head, facing, cell, (0..columns).map(|x| (x, rows - 1)));
    draw_border(&mut tensor, grid_size, head, facing, cell, (0..rows).map(|y| (0, y)));
    draw_border(&mut tensor, grid_size, head, facing, cell, (0..rows).map(|y| (columns - 1, y)));

    // line of sight, stepped at one pixel's worth of world distance
    let dx = facing.angle.cos();
    let dy = facing.angle.sin();
    for step in 1..grid_size / 2 {
        let px = ax + dx * step as f32 * cell;
        let py = ay + dy * step as f32 * cell;
        if !within_vision(ax, ay, facing, px, py) {
            break;
        }
        let (gx, gy) = to_grid(head, facing.range, cell, px, py);
        plot(&mut tensor, CHANNEL_FACING, grid_size, gx, gy);
    }

    tensor
}
