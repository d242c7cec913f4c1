pub mod constants;
pub mod movement;
pub mod registry;
pub mod sprites;
pub mod state;
pub mod world;
