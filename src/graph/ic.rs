use super::component::*;
use super::connection::*;
use crate::error::WiringError;
use indexmap::IndexMap;
use std::collections::HashMap;
use strum::IntoEnumIterator;

use Component::*;

/// Builds the argument list of [Ic::call] from `"pin" => bus` pairs.
///
/// Anything that implements `AsRef<[Connection]>` can be passed as a bus,
/// including a single [Connection].
///
/// # Example
/// ```
/// # use nandsim::{pins, Ic, Component};
/// let mut ic = Ic::new("Not");
/// let x = ic.declare_input("in", 1).unwrap();
/// ic.declare_output("out", 1).unwrap();
///
/// let nand = ic.call(Component::Nand, pins! { "a" => x, "b" => x }).unwrap();
/// let out = ic.pin(nand, "out").unwrap();
/// ic.output("out", out).unwrap();
/// ```
#[macro_export]
macro_rules! pins {
    ($($name:expr => $bus:expr),* $(,)?) => {
        &[$(($name, ::std::convert::AsRef::<[$crate::Connection]>::as_ref(&$bus))),*]
    };
}

/// Number of primitives of each [PrimitiveKind] in a hierarchy.
pub type GateCount = IndexMap<PrimitiveKind, usize>;

/// A handle to a reserved [Placeholder], see [Ic::forward].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct Forward {
    index: ComponentIndex,
    width: usize,
}

impl Forward {
    pub fn index(&self) -> ComponentIndex {
        self.index
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the producer bus standing for the not yet known signals.
    pub fn bus(&self) -> Vec<Connection> {
        (0..self.width)
            .map(|bit| Connection::new(self.index, "out", bit))
            .collect()
    }
}

/// An integrated circuit: a netlist of [Components](Component) with named input and output ports.
///
/// Components live in an arena and are addressed by [ComponentIndex], the first 4 slots always hold
/// [ROOT], [OFF], [ON] and [CLOCK]. Wires map every consumer pin bit to its single producer.
/// Through [ROOT], the declared inputs of the IC are producers and the declared outputs are consumers.
///
/// ICs are built once and then [flattened](Ic::flatten) into new ICs that only contain primitives.
///
/// # Example
/// A 1 bit latch made of a DFF and a feedback loop.
/// ```
/// # use nandsim::{pins, Ic, SimConfig, synthesize_ic};
/// # use nandsim::circuits::mux;
/// let mut ic = Ic::new("Bit");
/// let input = ic.declare_input("in", 1).unwrap();
/// let load = ic.declare_input("load", 1).unwrap();
/// ic.declare_output("out", 1).unwrap();
///
/// let feedback = ic.forward(1).unwrap();
/// let m = ic
///     .call(mux().unwrap(), pins! { "a" => feedback.bus(), "b" => input, "sel" => load })
///     .unwrap();
/// let m_out = ic.pin(m, "out").unwrap();
/// let q = ic.dff(&m_out[0]).unwrap();
/// ic.resolve(feedback, &q).unwrap();
/// ic.output("out", &q).unwrap();
///
/// let mut e = synthesize_ic(&ic, &SimConfig::default()).unwrap();
/// e.set("in", 1).unwrap();
/// e.set("load", 1).unwrap();
/// e.tick_tock(1).unwrap();
/// assert_eq!(e.get("out").unwrap(), 1);
///
/// e.set("in", 0).unwrap();
/// e.set("load", 0).unwrap();
/// e.tick_tock(1).unwrap();
/// assert_eq!(e.get("out").unwrap(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Ic {
    label: String,
    inputs: IndexMap<PinName, usize>,
    outputs: IndexMap<PinName, usize>,
    pub(super) components: Vec<Component>,
    pub(super) wires: IndexMap<Connection, Connection>,
}

impl Ic {
    /// Returns a new [Ic] with no ports containing only the special components.
    pub fn new<S: Into<String>>(label: S) -> Ic {
        Ic {
            label: label.into(),
            inputs: Default::default(),
            outputs: Default::default(),
            components: vec![Root, Constant(false), Constant(true), Clock],
            wires: Default::default(),
        }
    }

    /// Returns a new [Ic] with the ports of `self` and no components.
    pub(super) fn empty_like(&self) -> Ic {
        Ic {
            label: self.label.clone(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            components: self.components[..SPECIAL_COMPONENTS].to_vec(),
            wires: Default::default(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the arena of components.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Returns the component at `idx`.
    pub fn component(&self, idx: ComponentIndex) -> Option<&Component> {
        self.components.get(idx.idx)
    }

    /// Returns the wires, consumer first and producer second.
    pub fn wires(&self) -> impl Iterator<Item = (&Connection, &Connection)> {
        self.wires.iter()
    }

    /// Returns the producer wired to `consumer`.
    pub fn producer_of(&self, consumer: &Connection) -> Option<&Connection> {
        self.wires.get(consumer)
    }

    /// Returns the number of components, special components included.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns the declared inputs and their widths in declaration order.
    pub fn declared_inputs(&self) -> impl Iterator<Item = (&str, usize)> {
        self.inputs.iter().map(|(name, width)| (&**name, *width))
    }

    /// Returns the declared outputs and their widths in declaration order.
    pub fn declared_outputs(&self) -> impl Iterator<Item = (&str, usize)> {
        self.outputs.iter().map(|(name, width)| (&**name, *width))
    }

    pub fn declared_input_width(&self, name: &str) -> Option<usize> {
        self.inputs.get(name).copied()
    }

    pub fn declared_output_width(&self, name: &str) -> Option<usize> {
        self.outputs.get(name).copied()
    }

    /// Returns true if the IC only contains primitives.
    pub fn is_flat(&self) -> bool {
        self.components[SPECIAL_COMPONENTS..]
            .iter()
            .all(Component::is_primitive)
    }

    /// Returns the human readable label of `c` in format "IC_LABEL/KIND#INDEX.PIN[BIT]".
    pub fn label_of(&self, c: &Connection) -> String {
        let kind = self.component(c.component).map_or("?", Component::name);
        format!(
            "{}/{}#{}.{}[{}]",
            self.label, kind, c.component, c.pin, c.bit
        )
    }

    /// Returns the width of producer pin `c.pin`, if it exists.
    pub(super) fn producer_width(&self, c: &Connection) -> Option<usize> {
        match self.component(c.component)? {
            Root => self.declared_input_width(&c.pin),
            component => component.output_width(&c.pin),
        }
    }

    /// Returns the width of consumer pin `c.pin`, if it exists.
    pub(super) fn consumer_width(&self, c: &Connection) -> Option<usize> {
        match self.component(c.component)? {
            Root => self.declared_output_width(&c.pin),
            component => component.input_width(&c.pin),
        }
    }

    fn check_pin(&self, c: &Connection, width: Option<usize>) -> Result<(), WiringError> {
        match width {
            None => Err(WiringError::UnknownPin {
                label: self.label_of(c),
            }),
            Some(width) if c.bit >= width => Err(WiringError::BitOutOfRange {
                label: self.label_of(c),
                width,
            }),
            Some(_) => Ok(()),
        }
    }

    fn check_port_name(&self, name: &str, width: usize) -> Result<(), WiringError> {
        let label = format!("{}/{}", self.label, name);
        if width == 0 {
            return Err(WiringError::ZeroWidth { label });
        }
        if self.inputs.contains_key(name) || self.outputs.contains_key(name) {
            return Err(WiringError::DuplicatePort { label });
        }
        Ok(())
    }

    /// Declares input port `name` and returns the bus it produces inside the IC.
    pub fn declare_input<S: Into<PinName>>(
        &mut self,
        name: S,
        width: usize,
    ) -> Result<Vec<Connection>, WiringError> {
        let name = name.into();
        self.check_port_name(&name, width)?;
        self.inputs.insert(name.clone(), width);
        Ok((0..width)
            .map(|bit| Connection::new(ROOT, name.clone(), bit))
            .collect())
    }

    /// Declares output port `name`, to be wired with [Ic::output].
    pub fn declare_output<S: Into<PinName>>(
        &mut self,
        name: S,
        width: usize,
    ) -> Result<(), WiringError> {
        let name = name.into();
        self.check_port_name(&name, width)?;
        self.outputs.insert(name, width);
        Ok(())
    }

    /// Appends `component` to the arena and returns its index.
    pub fn add<C: Into<Component>>(&mut self, component: C) -> ComponentIndex {
        self.components.push(component.into());
        ci!(self.components.len() - 1)
    }

    /// Follows resolved placeholders until a real producer is found.
    fn substitute_forward(&self, producer: Connection) -> Result<Connection, WiringError> {
        let mut producer = producer;
        for _ in 0..self.components.len() {
            match self.component(producer.component) {
                Some(Component::Forward(Placeholder::Resolved(bus))) => match bus.get(producer.bit) {
                    Some(next) => producer = next.clone(),
                    None => {
                        return Err(WiringError::BitOutOfRange {
                            label: self.label_of(&producer),
                            width: bus.len(),
                        })
                    }
                },
                _ => return Ok(producer),
            }
        }
        Err(WiringError::BoundaryLoop {
            label: self.label_of(&producer),
        })
    }

    /// Wires `producer` into `consumer`, replacing any previous producer of `consumer`.
    ///
    /// Fails if either pin doesn't exist, a bit is out of range or both ends are the same component.
    pub fn wire(&mut self, producer: Connection, consumer: Connection) -> Result<(), WiringError> {
        self.check_pin(&producer, self.producer_width(&producer))?;
        self.check_pin(&consumer, self.consumer_width(&consumer))?;
        let producer = self.substitute_forward(producer)?;
        if producer.component == consumer.component && !consumer.component.is_root() {
            return Err(WiringError::SelfWiring {
                label: self.label_of(&consumer),
            });
        }
        self.wires.insert(consumer, producer);
        Ok(())
    }

    /// Wires every bit of `producers` into the matching bit of `consumers`.
    pub fn wire_bus(
        &mut self,
        producers: &[Connection],
        consumers: &[Connection],
    ) -> Result<(), WiringError> {
        if producers.len() != consumers.len() {
            let label = consumers
                .first()
                .map_or_else(|| self.label.clone(), |c| self.label_of(c));
            return Err(WiringError::WidthMismatch {
                label,
                expected: consumers.len(),
                actual: producers.len(),
            });
        }
        for (producer, consumer) in producers.iter().zip(consumers) {
            self.wire(producer.clone(), consumer.clone())?;
        }
        Ok(())
    }

    /// Returns the bus produced by declared input `name`.
    pub fn input(&self, name: &str) -> Result<Vec<Connection>, WiringError> {
        let width = self
            .inputs
            .get_full(name)
            .map(|(_, name, width)| (name.clone(), *width));
        match width {
            Some((name, width)) => Ok((0..width)
                .map(|bit| Connection::new(ROOT, name.clone(), bit))
                .collect()),
            None => Err(WiringError::UnknownPin {
                label: format!("{}/{}", self.label, name),
            }),
        }
    }

    /// Wires `bus` into declared output `name`.
    pub fn output<B: AsRef<[Connection]>>(&mut self, name: &str, bus: B) -> Result<(), WiringError> {
        let (name, width) = match self.outputs.get_full(name) {
            Some((_, name, width)) => (name.clone(), *width),
            None => {
                return Err(WiringError::UnknownPin {
                    label: format!("{}/{}", self.label, name),
                })
            }
        };
        let consumers: Vec<_> = (0..width)
            .map(|bit| Connection::new(ROOT, name.clone(), bit))
            .collect();
        self.wire_bus(bus.as_ref(), &consumers)
    }

    /// Instantiates `component` and wires every `(pin, bus)` of `args` into its inputs.
    ///
    /// Use [pins!](crate::pins) to build `args`.
    pub fn call<C: Into<Component>>(
        &mut self,
        component: C,
        args: &[(&str, &[Connection])],
    ) -> Result<ComponentIndex, WiringError> {
        let idx = self.add(component);
        for (pin, bus) in args {
            let pin: PinName = (*pin).into();
            let width = self.consumer_width(&Connection::new(idx, pin.clone(), 0));
            let width = match width {
                Some(width) => width,
                None => {
                    return Err(WiringError::UnknownPin {
                        label: self.label_of(&Connection::new(idx, pin, 0)),
                    })
                }
            };
            let consumers: Vec<_> = (0..width)
                .map(|bit| Connection::new(idx, pin.clone(), bit))
                .collect();
            self.wire_bus(bus, &consumers)?;
        }
        Ok(idx)
    }

    /// Returns the bus produced by output `name` of component `idx`.
    pub fn pin(&self, idx: ComponentIndex, name: &str) -> Result<Vec<Connection>, WiringError> {
        let name: PinName = name.into();
        match self.producer_width(&Connection::new(idx, name.clone(), 0)) {
            Some(width) if !idx.is_root() => Ok((0..width)
                .map(|bit| Connection::new(idx, name.clone(), bit))
                .collect()),
            _ => Err(WiringError::UnknownPin {
                label: self.label_of(&Connection::new(idx, name, 0)),
            }),
        }
    }

    /// Returns the output of a new NAND gate.
    pub fn nand(&mut self, a: &Connection, b: &Connection) -> Result<Connection, WiringError> {
        let idx = self.call(Nand, pins! { "a" => a, "b" => b })?;
        Ok(Connection::new(idx, "out", 0))
    }

    /// Returns the output of a new DFF latching `d`.
    pub fn dff(&mut self, d: &Connection) -> Result<Connection, WiringError> {
        let idx = self.call(Dff, pins! { "in" => d })?;
        Ok(Connection::new(idx, "out", 0))
    }

    /// Returns the signal of [ON] or [OFF].
    pub fn constant(&self, value: bool) -> Connection {
        Connection::new(if value { ON } else { OFF }, "out", 0)
    }

    /// Returns the global clock signal, high between [tick](crate::Evaluator::tick) and
    /// [tock](crate::Evaluator::tock).
    pub fn clock(&self) -> Connection {
        Connection::new(CLOCK, "out", 0)
    }

    /// Reserves a `width` bits wide placeholder whose producers are given later with [Ic::resolve].
    pub fn forward(&mut self, width: usize) -> Result<Forward, WiringError> {
        if width == 0 {
            return Err(WiringError::ZeroWidth {
                label: format!("{}/Forward#{}", self.label, self.components.len()),
            });
        }
        let index = self.add(Component::Forward(Placeholder::Unresolved { width }));
        Ok(Forward { index, width })
    }

    /// Binds `forward` to `bus` and rewires every consumer of the placeholder to `bus`.
    pub fn resolve<B: AsRef<[Connection]>>(
        &mut self,
        forward: Forward,
        bus: B,
    ) -> Result<(), WiringError> {
        let bus = bus.as_ref();
        let placeholder = Connection::new(forward.index, "out", 0);
        match self.component(forward.index) {
            Some(Component::Forward(Placeholder::Unresolved { width })) => {
                if *width != bus.len() {
                    return Err(WiringError::WidthMismatch {
                        label: self.label_of(&placeholder),
                        expected: *width,
                        actual: bus.len(),
                    });
                }
            }
            Some(Component::Forward(Placeholder::Resolved(_))) => {
                return Err(WiringError::AlreadyResolved {
                    label: self.label_of(&placeholder),
                })
            }
            _ => {
                return Err(WiringError::UnknownPin {
                    label: self.label_of(&placeholder),
                })
            }
        }

        let mut resolved = Vec::with_capacity(bus.len());
        for producer in bus {
            self.check_pin(producer, self.producer_width(producer))?;
            let producer = self.substitute_forward(producer.clone())?;
            if producer.component == forward.index {
                return Err(WiringError::SelfWiring {
                    label: self.label_of(&placeholder),
                });
            }
            resolved.push(producer);
        }

        let self_wired = self.wires.iter().find(|(consumer, producer)| {
            producer.component == forward.index
                && resolved[producer.bit].component == consumer.component
                && !consumer.component.is_root()
        });
        if let Some((consumer, _)) = self_wired {
            return Err(WiringError::SelfWiring {
                label: self.label_of(consumer),
            });
        }
        for producer in self.wires.values_mut() {
            if producer.component == forward.index {
                *producer = resolved[producer.bit].clone();
            }
        }
        self.components[forward.index.idx] = Component::Forward(Placeholder::Resolved(resolved));
        Ok(())
    }

    /// Returns the number of primitives of each kind in the hierarchy, before any pruning.
    pub fn gate_count(&self) -> GateCount {
        let mut count: GateCount = PrimitiveKind::iter().map(|kind| (kind, 0)).collect();
        self.accumulate_gate_count(&mut count);
        count
    }

    fn accumulate_gate_count(&self, count: &mut GateCount) {
        for component in &self.components {
            match component {
                Component::Ic(child) => child.accumulate_gate_count(count),
                component => {
                    if let Some(kind) = component.kind() {
                        *count.entry(kind).or_insert(0) += 1;
                    }
                }
            }
        }
    }

    /// Dumps the netlist in [dot](https://en.wikipedia.org/wiki/DOT_(graph_description_language)) format
    /// to path `filename`. Child ICs are drawn as a single node.
    pub fn dump_dot<P: AsRef<std::path::Path>>(&self, filename: P) -> std::io::Result<()> {
        use petgraph::dot::{Config, Dot};
        use std::io::Write;
        let mut f = std::fs::File::create(filename)?;
        let mut graph = petgraph::Graph::<_, ()>::new();
        let mut index = HashMap::new();
        for (i, component) in self.components.iter().enumerate() {
            let label = format!("{}#{}", component.name(), i);
            index.insert(i, graph.add_node(label));
        }
        graph.extend_with_edges(
            self.wires
                .iter()
                .map(|(consumer, producer)| (index[&producer.component.idx], index[&consumer.component.idx])),
        );
        write!(f, "{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }
}

/// Returns the number of primitives of each kind in the hierarchy of `ic`.
pub fn gate_count(ic: &Ic) -> GateCount {
    ic.gate_count()
}

impl From<Ic> for Component {
    fn from(ic: Ic) -> Self {
        Component::Ic(Box::new(ic))
    }
}
