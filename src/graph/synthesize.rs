use super::component::*;
use super::connection::*;
use super::evaluator::*;
use super::ic::Ic;
use super::schedule::schedule;
use crate::data_structures::{Bit, TraceWord};
use crate::error::{SimError, WiringError};
use indexmap::IndexMap;
use smallvec::SmallVec;
use unwrap::unwrap;

use Component::*;

/// Bit allocation of a flat [Ic].
struct Signals<'a> {
    ic: &'a Ic,
    bits: IndexMap<Connection, Bit>,
}

impl<'a> Signals<'a> {
    /// Allocates a bit for every declared input, the clock if it is used and every consumed producer.
    fn new(ic: &'a Ic) -> Self {
        let mut signals = Signals {
            ic,
            bits: Default::default(),
        };
        for (name, width) in ic.declared_inputs() {
            for bit in 0..width {
                signals.allocate(Connection::new(ROOT, name, bit));
            }
        }
        let clock = Connection::new(CLOCK, "out", 0);
        if ic.wires().any(|(_, producer)| *producer == clock) {
            signals.allocate(clock);
        }
        for (_, producer) in ic.wires() {
            signals.allocate(producer.clone());
        }
        signals
    }

    fn allocate(&mut self, c: Connection) -> Bit {
        let next = Bit::new(self.bits.len());
        *self.bits.entry(c).or_insert(next)
    }

    /// Returns the bit of the producer wired into `consumer`.
    fn input(&self, component: ComponentIndex, pin: &str, bit: usize) -> Result<Bit, SimError> {
        let consumer = Connection::new(component, pin, bit);
        let producer = self
            .ic
            .producer_of(&consumer)
            .ok_or_else(|| WiringError::Unconnected {
                label: self.ic.label_of(&consumer),
            })?;
        Ok(*unwrap!(
            self.bits.get(producer),
            "Consumed producer {} has no bit",
            producer
        ))
    }

    /// Returns the bits wired into every bit of `pin`.
    fn input_bus(&self, component: ComponentIndex, pin: &str, width: usize) -> Result<Bus, SimError> {
        (0..width).map(|bit| self.input(component, pin, bit)).collect()
    }

    /// Returns the consumed bits of output `pin` and their position in the pin.
    fn output_bus(&self, component: ComponentIndex, pin: &str, width: usize) -> SmallVec<[(usize, Bit); 16]> {
        (0..width)
            .filter_map(|bit| {
                let c = Connection::new(component, pin, bit);
                self.bits.get(&c).map(|b| (bit, *b))
            })
            .collect()
    }

    fn output(&self, component: ComponentIndex, pin: &str) -> Option<Bit> {
        self.bits.get(&Connection::new(component, pin, 0)).copied()
    }
}

fn check_width(label: &str, width: usize) -> Result<(), SimError> {
    if width == 0 || width > 64 {
        return Err(SimError::Shape(format!(
            "{} is {} bits wide, ports must be between 1 and 64 bits",
            label, width
        )));
    }
    Ok(())
}

/// Checks that every port fits in a word.
fn check_shapes(ic: &Ic) -> Result<(), SimError> {
    for (name, width) in ic.declared_inputs().chain(ic.declared_outputs()) {
        check_width(&format!("{}/{}", ic.label(), name), width)?;
    }
    for (i, component) in ic.components().iter().enumerate() {
        match component {
            Input(port) | Output(port) => {
                check_width(&format!("{}/{}#{}", ic.label(), component.name(), i), port.width())?
            }
            Rom(memory) | Ram(memory) => check_width(
                &format!("{}/{}#{}", ic.label(), component.name(), i),
                memory.word_width(),
            )?,
            _ => {}
        }
    }
    Ok(())
}

/// Returns a new [Evaluator] for `ic`, flattening it first if needed.
///
/// Compiles one combine op per component in [schedule](super::schedule) order and one sequence op
/// per stateful component.
///
/// # Errors
///
/// [SimError::Shape] if a port or memory word is wider than 64 bits or `config` allows no passes,
/// [SimError::Wiring] if flattening fails.
pub fn synthesize(ic: &Ic, config: &SimConfig) -> Result<Evaluator, SimError> {
    let flattened;
    let ic = if ic.is_flat() {
        ic
    } else {
        flattened = ic.flatten()?;
        &flattened
    };
    compile(ic, &schedule(ic), config)
}

/// Compiles the flat `ic` with its combine ops in `order`, which must be a valid schedule.
fn compile(ic: &Ic, order: &[ComponentIndex], config: &SimConfig) -> Result<Evaluator, SimError> {
    if config.max_passes == 0 {
        return Err(SimError::Shape(format!(
            "{} can't be evaluated in 0 passes",
            ic.label()
        )));
    }
    check_shapes(ic)?;

    let signals = Signals::new(ic);
    let components = ic.components();

    let mut position = vec![None; ic.len()];
    let mut combine_ops = Vec::new();
    let mut sequence_ops = Vec::new();
    for idx in order {
        let idx = *idx;
        let component = &components[idx.idx];
        let op = match component {
            Nand => match signals.output(idx, "out") {
                Some(out) => Some(CombineOp::Nand {
                    a: signals.input(idx, "a", 0)?,
                    b: signals.input(idx, "b", 0)?,
                    out,
                }),
                None => None,
            },
            Rom(memory) | Ram(memory) => {
                let out = signals.output_bus(idx, "out", memory.word_width());
                if out.is_empty() {
                    None
                } else {
                    Some(CombineOp::Read {
                        address: signals.input_bus(idx, "address", memory.address_width())?,
                        out,
                        memory: memory.clone(),
                    })
                }
            }
            Input(port) => {
                let out = signals.output_bus(idx, "out", port.width());
                if out.is_empty() {
                    None
                } else {
                    Some(CombineOp::Input {
                        out,
                        port: port.clone(),
                    })
                }
            }
            _ => None,
        };
        if let Some(op) = op {
            position[idx.idx] = Some(combine_ops.len());
            combine_ops.push(op);
        }

        let op = match component {
            Dff => match signals.output(idx, "out") {
                Some(out) => Some(SequenceOp::Latch {
                    input: signals.input(idx, "in", 0)?,
                    out,
                }),
                None => None,
            },
            Ram(memory) => Some(SequenceOp::Write {
                address: signals.input_bus(idx, "address", memory.address_width())?,
                data: signals.input_bus(idx, "in", memory.word_width())?,
                load: signals.input(idx, "load", 0)?,
                memory: memory.clone(),
            }),
            Output(port) => Some(SequenceOp::Record {
                data: signals.input_bus(idx, "in", port.width())?,
                port: port.clone(),
            }),
            _ => None,
        };
        sequence_ops.extend(op);
    }

    // A consumer evaluated before its producer sees a stale value, changes of those bits need
    // another pass.
    let mut forward_mask = TraceWord::new(signals.bits.len());
    for bit in signals.bits.values() {
        forward_mask.set(*bit, true);
    }
    for (consumer, producer) in ic.wires() {
        let consumer_position = match position[consumer.component.idx] {
            Some(p) if !consumer.component.is_root() => p,
            _ => continue,
        };
        if !components[consumer.component.idx]
            .combinational_inputs()
            .contains(&&*consumer.pin)
        {
            continue;
        }
        if let Some(producer_position) = position[producer.component.idx] {
            if producer_position >= consumer_position {
                forward_mask.set(signals.bits[producer], false);
            }
        }
    }

    let mut trace = TraceWord::new(signals.bits.len());
    if let Some(on) = signals.output(ON, "out") {
        trace.set(on, true);
    }

    let inputs = ic
        .declared_inputs()
        .map(|(name, width)| {
            let bus = (0..width)
                .map(|bit| signals.bits[&Connection::new(ROOT, name, bit)])
                .collect();
            (name.into(), bus)
        })
        .collect();
    let outputs = ic
        .declared_outputs()
        .map(|(name, width)| Ok((name.into(), signals.input_bus(ROOT, name, width)?)))
        .collect::<Result<IndexMap<_, _>, SimError>>()?;
    let clock = signals.output(CLOCK, "out");

    clilog::info!(
        "Synthesized {}: {} components, {} signals, {} combine ops, {} sequence ops",
        ic.label(),
        ic.len(),
        signals.bits.len(),
        combine_ops.len(),
        sequence_ops.len()
    );

    Ok(Evaluator::new(
        trace,
        forward_mask,
        inputs,
        outputs,
        signals.bits,
        clock,
        combine_ops,
        sequence_ops,
        config,
    ))
}

/// Runs the whole pipeline on `ic`: flatten, optimize if `config.optimize` is set, flatten again and
/// synthesize.
pub fn synthesize_ic(ic: &Ic, config: &SimConfig) -> Result<Evaluator, SimError> {
    let flat = ic.flatten()?;
    clilog::info!(
        "Flattened {}: {} components, {} wires",
        ic.label(),
        flat.len(),
        flat.wires().count()
    );
    let flat = if config.optimize {
        flat.optimize()?
    } else {
        flat
    };
    synthesize(&flat, config)
}
