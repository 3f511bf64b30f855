//! Hierarchical netlists of NAND gates, flattened, optimized and synthesized into a
//! bit packed evaluator.
//!
//! Circuits are described as [Ic]s, see [circuits] for a library going from a NOT gate to
//! a full computer, and [machine] to run programs on it.
#[macro_use]
pub mod graph;
pub mod circuits;
pub mod data_structures;
pub mod error;
pub mod machine;
pub use error::*;
pub use graph::*;
