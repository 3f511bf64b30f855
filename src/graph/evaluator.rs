use super::component::*;
use super::connection::*;
use crate::data_structures::{Bit, TraceWord};
use crate::error::SimError;
use concat_idents::concat_idents;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// Default bound of [Evaluator::propagate] passes.
///
/// This is a heuristic tuned on the bundled circuits, not a proof that anything converging at
/// all converges within it. Scheduled acyclic logic settles in 1 pass, feedback loops take
/// more depending on where they were cut.
pub const DEFAULT_MAX_PASSES: usize = 32;

/// Bits of a port or pin, least significant first.
pub type Bus = SmallVec<[Bit; 16]>;

/// Knobs of the synthesis pipeline.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SimConfig {
    /// Maximum number of passes a propagation can take before failing with [SimError::Convergence].
    /// Must be at least 1.
    pub max_passes: usize,
    /// Run the [optimizer](super::Ic::optimize) before synthesizing.
    pub optimize: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            max_passes: DEFAULT_MAX_PASSES,
            optimize: true,
        }
    }
}

/// Behavior of a component between clock edges.
#[derive(Debug, Clone)]
pub(super) enum CombineOp {
    Nand {
        a: Bit,
        b: Bit,
        out: Bit,
    },
    /// ROM and RAM reads, out of range addresses read 0.
    Read {
        address: Bus,
        /// Word bit and the signal it drives, only for consumed bits.
        out: SmallVec<[(usize, Bit); 16]>,
        memory: Memory,
    },
    Input {
        out: SmallVec<[(usize, Bit); 16]>,
        port: Port,
    },
}

/// Behavior of a component on the clock edge.
#[derive(Debug, Clone)]
pub(super) enum SequenceOp {
    Latch {
        input: Bit,
        out: Bit,
    },
    Write {
        address: Bus,
        data: Bus,
        load: Bit,
        memory: Memory,
    },
    Record {
        data: Bus,
        port: Port,
    },
}

/// Returns the value of `bits` as a number.
#[inline(always)]
fn collect(trace: &TraceWord, bits: &[Bit]) -> u64 {
    let mut value = 0;
    for (i, bit) in bits.iter().enumerate() {
        if trace.get(*bit) {
            value |= 1 << i;
        }
    }
    value
}

impl CombineOp {
    // Main VERY HOT loop.
    #[inline(always)]
    fn apply(&self, trace: &mut TraceWord) {
        match self {
            CombineOp::Nand { a, b, out } => {
                // This is safe because every Bit of an op was allocated inside the trace
                // at synthesis, checked once in Evaluator::new.
                unsafe {
                    let value = !(trace.get_very_unsafely(*a) && trace.get_very_unsafely(*b));
                    trace.set_very_unsafely(*out, value);
                }
            }
            CombineOp::Read {
                address,
                out,
                memory,
            } => {
                let word = memory.read(collect(trace, address) as usize);
                for (i, bit) in out {
                    trace.set(*bit, word >> i & 1 != 0);
                }
            }
            CombineOp::Input { out, port } => {
                let word = port.get();
                for (i, bit) in out {
                    trace.set(*bit, word >> i & 1 != 0);
                }
            }
        }
    }

    fn max_bit(&self) -> Option<Bit> {
        match self {
            CombineOp::Nand { a, b, out } => [*a, *b, *out].iter().copied().max(),
            CombineOp::Read { address, out, .. } => address
                .iter()
                .copied()
                .chain(out.iter().map(|(_, bit)| *bit))
                .max(),
            CombineOp::Input { out, .. } => out.iter().map(|(_, bit)| *bit).max(),
        }
    }
}

/// Generates the get_type and set_type accessors for [Evaluator].
macro_rules! typed_accessors {
    ($ty:ident,$($rest:ident),*) => {
        typed_accessors!($ty);
        typed_accessors!($($rest),*);
    };
    ($ty:ident) => {
        concat_idents!(get_t = get, _, $ty {
            /// Returns the value of port `name` converted to the corresponding type.
            ///
            /// If the port is wider than the type, the excess bits are ignored.
            pub fn get_t(&mut self, name: &str) -> Result<$ty, SimError> {
                Ok(self.get(name)? as $ty)
            }
        });
        concat_idents!(set_t = set, _, $ty {
            /// Sets input `name` to `value`, see [Evaluator::set].
            pub fn set_t(&mut self, name: &str, value: $ty) -> Result<(), SimError> {
                self.set(name, value as u64)
            }
        });
    };
}

/// A synthesized circuit, the bits of every live signal packed in a [TraceWord].
///
/// Changes to the inputs are batched until the next read, which runs the combinational logic
/// until it stops changing. The clock goes high with [tick](Evaluator::tick) and the stateful
/// components latch on [tock](Evaluator::tock).
///
/// Created by [synthesize](super::synthesize) or [synthesize_ic](super::synthesize_ic).
///
/// # Example
/// ```
/// # use nandsim::{SimConfig, synthesize_ic};
/// # use nandsim::circuits::xor;
/// let mut e = synthesize_ic(&xor().unwrap(), &SimConfig::default()).unwrap();
///
/// e.set("a", 1).unwrap();
/// e.set("b", 0).unwrap();
/// assert_eq!(e.get("out").unwrap(), 1);
///
/// e.set_bit("b", 0, true).unwrap();
/// assert_eq!(e.get_bit("out", 0).unwrap(), false);
/// ```
#[derive(Debug, Clone)]
pub struct Evaluator {
    trace: TraceWord,
    // Allocated outside to prevent allocations in the hot loop.
    previous: TraceWord,
    latched: Vec<(Bit, bool)>,
    /// Bits whose consumers all come after their producer in `combine_ops`.
    forward_mask: TraceWord,
    inputs: IndexMap<PinName, Bus>,
    outputs: IndexMap<PinName, Bus>,
    internal: IndexMap<Connection, Bit>,
    clock: Option<Bit>,
    combine_ops: Vec<CombineOp>,
    sequence_ops: Vec<SequenceOp>,
    max_passes: usize,
    passes: usize,
    dirty: bool,
}

impl Evaluator {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        trace: TraceWord,
        forward_mask: TraceWord,
        inputs: IndexMap<PinName, Bus>,
        outputs: IndexMap<PinName, Bus>,
        internal: IndexMap<Connection, Bit>,
        clock: Option<Bit>,
        combine_ops: Vec<CombineOp>,
        sequence_ops: Vec<SequenceOp>,
        config: &SimConfig,
    ) -> Evaluator {
        // The hot loop doesn't check bounds, check them once here.
        let max_bit = combine_ops.iter().filter_map(CombineOp::max_bit).max();
        assert!(
            max_bit.map_or(true, |bit| bit.index() < trace.len()),
            "Tried to synthesize an op reading bit {:?} outside of a trace of {} bits",
            max_bit,
            trace.len()
        );
        Evaluator {
            previous: trace.clone(),
            latched: Vec::with_capacity(sequence_ops.len()),
            trace,
            forward_mask,
            inputs,
            outputs,
            internal,
            clock,
            combine_ops,
            sequence_ops,
            max_passes: config.max_passes,
            passes: 0,
            dirty: true,
        }
    }

    fn input_bus(&self, name: &str) -> Result<&Bus, SimError> {
        self.inputs
            .get(name)
            .ok_or_else(|| SimError::UnknownSignal {
                name: name.into(),
                bit: 0,
            })
    }

    /// Returns the bits of output `name`, or of input `name` if there is no such output.
    fn readable_bus(&self, name: &str) -> Result<&Bus, SimError> {
        match self.outputs.get(name) {
            Some(bus) => Ok(bus),
            None => self.input_bus(name),
        }
    }

    /// Sets input `name` to the low bits of `value`, bits beyond the width of the input are ignored.
    pub fn set(&mut self, name: &str, value: u64) -> Result<(), SimError> {
        let bus = self
            .inputs
            .get(name)
            .ok_or_else(|| SimError::UnknownSignal {
                name: name.into(),
                bit: 0,
            })?;
        for (i, bit) in bus.iter().enumerate() {
            self.trace.set(*bit, value >> i & 1 != 0);
        }
        self.dirty = true;
        Ok(())
    }

    /// Sets bit `bit` of input `name` to `value`.
    pub fn set_bit(&mut self, name: &str, bit: usize, value: bool) -> Result<(), SimError> {
        let target = *self
            .input_bus(name)?
            .get(bit)
            .ok_or_else(|| SimError::UnknownSignal {
                name: name.into(),
                bit,
            })?;
        self.trace.set(target, value);
        self.dirty = true;
        Ok(())
    }

    /// Sets input `name` to `value`, failing with [SimError::UnknownSignal] on the highest set bit
    /// of `value` if it doesn't fit in the input.
    pub fn set_word(&mut self, name: &str, value: u64) -> Result<(), SimError> {
        let width = self.input_bus(name)?.len();
        let highest = 64 - value.leading_zeros() as usize;
        if highest > width {
            return Err(SimError::UnknownSignal {
                name: name.into(),
                bit: highest - 1,
            });
        }
        self.set(name, value)
    }

    /// Returns the value of output `name`, propagating pending changes first.
    ///
    /// Inputs can be read back too.
    pub fn get(&mut self, name: &str) -> Result<u64, SimError> {
        self.propagate_if_dirty()?;
        let bus = self.readable_bus(name)?;
        Ok(collect(&self.trace, bus))
    }

    /// Returns bit `bit` of output `name`, propagating pending changes first.
    pub fn get_bit(&mut self, name: &str, bit: usize) -> Result<bool, SimError> {
        self.propagate_if_dirty()?;
        let target = *self
            .readable_bus(name)?
            .get(bit)
            .ok_or_else(|| SimError::UnknownSignal {
                name: name.into(),
                bit,
            })?;
        Ok(self.trace.get(target))
    }

    /// Same as [Evaluator::get], for symmetry with [Evaluator::set_word].
    pub fn get_word(&mut self, name: &str) -> Result<u64, SimError> {
        self.get(name)
    }

    typed_accessors!(u8, i8, u16, i16, u32, i32, u64, i64);

    /// Returns the width of port `name`.
    pub fn width(&self, name: &str) -> Option<usize> {
        self.readable_bus(name).ok().map(|bus| bus.len())
    }

    /// Returns the names of the inputs in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(|name| &**name)
    }

    /// Returns the names of the outputs in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(|name| &**name)
    }

    fn propagate_if_dirty(&mut self) -> Result<(), SimError> {
        if self.dirty {
            self.propagate()?;
        }
        Ok(())
    }

    /// Evaluates the combinational logic until it reaches a fixed point and returns the number
    /// of passes it took.
    ///
    /// A pass that only changes bits whose consumers were all evaluated after them is final.
    ///
    /// # Errors
    ///
    /// [SimError::Convergence] if the fixed point isn't reached in `max_passes` passes.
    pub fn propagate(&mut self) -> Result<usize, SimError> {
        for pass in 1..=self.max_passes {
            self.previous.copy_from(&self.trace);
            for op in &self.combine_ops {
                op.apply(&mut self.trace);
            }
            self.passes += 1;
            if !self.trace.differs_outside(&self.previous, &self.forward_mask) {
                self.dirty = false;
                return Ok(pass);
            }
        }
        clilog::warn!(
            "Circuit didn't stabilize after {} passes",
            self.max_passes
        );
        Err(SimError::Convergence {
            passes: self.max_passes,
        })
    }

    /// Raises the clock.
    pub fn tick(&mut self) {
        if let Some(clock) = self.clock {
            self.trace.set(clock, true);
        }
        self.dirty = true;
    }

    /// Propagates, then every stateful component latches the values its inputs had before the
    /// edge, and the clock goes low.
    pub fn tock(&mut self) -> Result<(), SimError> {
        self.propagate()?;
        let trace = &self.trace;
        for op in &self.sequence_ops {
            match op {
                SequenceOp::Latch { input, out } => self.latched.push((*out, trace.get(*input))),
                SequenceOp::Write {
                    address,
                    data,
                    load,
                    memory,
                } => {
                    if trace.get(*load) {
                        memory.write(collect(trace, address) as usize, collect(trace, data));
                    }
                }
                SequenceOp::Record { data, port } => port.set(collect(trace, data)),
            }
        }
        for (bit, value) in self.latched.drain(..) {
            self.trace.set(bit, value);
        }
        if let Some(clock) = self.clock {
            self.trace.set(clock, false);
        }
        self.dirty = true;
        Ok(())
    }

    /// Runs `n` full clock cycles.
    pub fn tick_tock(&mut self, n: usize) -> Result<(), SimError> {
        for _ in 0..n {
            self.tick();
            self.tock()?;
        }
        Ok(())
    }

    /// Forces a propagation before the next read, for when a memory or an input port
    /// was modified from outside.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Returns the value of the internal signal produced by `c` in the synthesized circuit.
    pub fn peek_internal(&mut self, c: &Connection) -> Result<bool, SimError> {
        self.propagate_if_dirty()?;
        let bit = self
            .internal
            .get(c)
            .ok_or_else(|| SimError::UnknownSignal {
                name: c.to_string(),
                bit: c.bit,
            })?;
        Ok(self.trace.get(*bit))
    }

    /// Returns the total number of propagation passes run so far.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Returns the number of live signals.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.internal.len()
    }
}

/// Asserts that the evaluator reaches a fixed point, optionally within a range of passes.
#[macro_export]
macro_rules! assert_converges {
    ($e:expr) => {
        if let Err(e) = $e.propagate() {
            panic!("Circuit didn't converge: {}", e);
        }
    };
    ($e:expr, $expected:expr) => {
        let actual = match $e.propagate() {
            Ok(actual) => actual,
            Err(e) => panic!("Circuit didn't converge: {}", e),
        };
        assert!(
            $expected.contains(&actual),
            "Circuit converged after {} passes, which is outside the range: {:?}",
            actual,
            $expected
        );
    };
}
