pub mod core;
pub mod minimap;
pub mod recording;
pub mod sensory;
pub mod simulation;
pub mod simulation_manager;
pub mod test_utils;
