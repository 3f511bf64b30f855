#[macro_use]
mod connection;
mod component;
mod evaluator;
mod flatten;
mod ic;
mod optimizations;
mod schedule;
mod synthesize;
pub use component::*;
pub use connection::*;
pub use evaluator::*;
pub use ic::*;
pub use schedule::*;
pub use synthesize::*;
