//! The standard component library: a 16 bit computer built from NAND gates up.
//!
//! Every function returns a fresh [Ic] ready to be instantiated with [Ic::call] or synthesized.
mod arithmetic;
mod computer;
mod cpu;
mod gates;
mod sequential;
mod wide;
pub use arithmetic::*;
pub use computer::*;
pub use cpu::*;
pub use gates::*;
pub use sequential::*;
pub use wide::*;

use crate::graph::*;
use crate::{pins, WiringError};

/// Width of the data bus.
pub const WORD: usize = 16;

/// Instantiates `child` in `ic` and returns the bus of its output "out".
pub(crate) fn apply<C: Into<Component>>(
    ic: &mut Ic,
    child: C,
    args: &[(&str, &[Connection])],
) -> Result<Vec<Connection>, WiringError> {
    let idx = ic.call(child, args)?;
    ic.pin(idx, "out")
}

/// Instantiates `child` in `ic` and returns the first bit of its output "out".
pub(crate) fn apply1<C: Into<Component>>(
    ic: &mut Ic,
    child: C,
    args: &[(&str, &[Connection])],
) -> Result<Connection, WiringError> {
    Ok(apply(ic, child, args)?.swap_remove(0))
}

/// Returns a bus of `width` constant `value` bits.
pub(crate) fn constant_bus(ic: &Ic, value: u64, width: usize) -> Vec<Connection> {
    (0..width).map(|i| ic.constant(value >> i & 1 != 0)).collect()
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::*;

    /// Returns a synthesized unoptimized evaluator for `ic`, so gate level behavior is tested.
    pub fn evaluator(ic: Result<Ic, WiringError>) -> Evaluator {
        let config = SimConfig {
            optimize: false,
            ..Default::default()
        };
        synthesize_ic(&ic.unwrap(), &config).unwrap()
    }

    /// Returns the number of NAND gates in the hierarchy of `ic`.
    pub fn nands(ic: Result<Ic, WiringError>) -> usize {
        ic.unwrap().gate_count()[&PrimitiveKind::Nand]
    }
}
