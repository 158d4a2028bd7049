use std::collections::VecDeque;

use parking_lot::Mutex;
use tinyrand::Wyrand;

use crate::core::{Brain, Direction, Facing, Position};

/// Test brain that replays a fixed script of directions in order.
/// Panics if more decisions are requested than scripted.
pub struct ScriptedBrain {
    script: Mutex<VecDeque<Direction>>,
}

impl ScriptedBrain {
    pub fn new(moves: impl IntoIterator<Item = Direction>) -> Self {
        ScriptedBrain {
            script: Mutex::new(moves.into_iter().collect()),
        }
    }
}

impl Brain for ScriptedBrain {
    fn decide(
        &self,
        _head: Position,
        _current: Direction,
        _facing: Facing,
        _visible_targets: &[Position],
        _rng: &mut Wyrand,
    ) -> Direction {
        self.script
            .lock()
            .pop_front()
            .expect("ScriptedBrain: script exhausted")
    }
}
