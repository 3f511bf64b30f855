use super::connection::*;
use super::Ic;
use crate::error::SimError;
use smallvec::{smallvec, SmallVec};
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;
use strum_macros::{Display, EnumIter};

/// Widest address bus a [Memory] can have, 2^24 words.
pub const MAX_ADDRESS_WIDTH: usize = 24;

/// Returns a mask with the `width` least significant bits set.
pub(crate) fn width_mask(width: usize) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1 << width) - 1
    }
}

/// The kinds of leaf components a flattened [Ic] is made of.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd, Display, EnumIter)]
pub enum PrimitiveKind {
    Nand,
    Dff,
    Rom,
    Ram,
    Input,
    Output,
}

/// Word addressed storage shared between a ROM/RAM component and the harness driving it.
///
/// Cloning a [Memory] shares the storage, which is how a harness keeps access to the words of
/// a memory after the component has been moved into an [Ic] and synthesized.
///
/// # Example
/// ```
/// # use nandsim::Memory;
/// let m = Memory::new(2, 8).unwrap();
/// let harness = m.clone();
///
/// m.write(3, 0x1ff);
/// assert_eq!(harness.read(3), 0xff);
/// assert_eq!(harness.read(4), 0);
/// ```
#[derive(Clone)]
pub struct Memory {
    address_width: usize,
    word_width: usize,
    words: Rc<RefCell<Vec<u64>>>,
}

impl Memory {
    /// Returns a zeroed memory of 2^`address_width` words of `word_width` bits.
    ///
    /// Fails with [SimError::Shape] if `word_width` is not in 1..=64
    /// or `address_width` is not in 1..=[MAX_ADDRESS_WIDTH].
    pub fn new(address_width: usize, word_width: usize) -> Result<Self, SimError> {
        if word_width == 0 || word_width > 64 {
            return Err(SimError::Shape(format!(
                "memory word width must be between 1 and 64 bits, got {}",
                word_width
            )));
        }
        if address_width == 0 || address_width > MAX_ADDRESS_WIDTH {
            return Err(SimError::Shape(format!(
                "memory address width must be between 1 and {} bits, got {}",
                MAX_ADDRESS_WIDTH, address_width
            )));
        }
        Ok(Memory {
            address_width,
            word_width,
            words: Rc::new(RefCell::new(vec![0; 1 << address_width])),
        })
    }

    pub fn address_width(&self) -> usize {
        self.address_width
    }

    pub fn word_width(&self) -> usize {
        self.word_width
    }

    /// Returns the number of words.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        1 << self.address_width
    }

    /// Returns the word at `address`, or 0 if `address` is out of range.
    #[inline(always)]
    pub fn read(&self, address: usize) -> u64 {
        self.words.borrow().get(address).copied().unwrap_or(0)
    }

    /// Stores `value` truncated to the word width at `address`.
    /// Writes out of range are ignored.
    pub fn write(&self, address: usize, value: u64) {
        if let Some(word) = self.words.borrow_mut().get_mut(address) {
            *word = value & width_mask(self.word_width);
        }
    }

    /// Copies `words` to the beginning of the memory and zeroes the rest.
    /// Excess words are ignored.
    pub fn load<I: IntoIterator<Item = u64>>(&self, words: I) {
        let mask = width_mask(self.word_width);
        let mut storage = self.words.borrow_mut();
        for w in storage.iter_mut() {
            *w = 0;
        }
        for (slot, word) in storage.iter_mut().zip(words) {
            *slot = word & mask;
        }
    }

    /// Returns true if `self` and `other` are views of the same storage.
    pub fn shares_storage(&self, other: &Memory) -> bool {
        Rc::ptr_eq(&self.words, &other.words)
    }
}

impl PartialEq for Memory {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage(other)
    }
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Memory({}x{})", self.len(), self.word_width)
    }
}

/// A value exchanged with the outside world by an [Input](Component::Input) or
/// [Output](Component::Output) stub. Clones share the value.
#[derive(Clone)]
pub struct Port {
    width: usize,
    value: Rc<Cell<u64>>,
}

impl Port {
    pub fn new(width: usize) -> Self {
        Port {
            width,
            value: Rc::new(Cell::new(0)),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn get(&self) -> u64 {
        self.value.get()
    }

    /// Sets the value truncated to the port width.
    pub fn set(&self, value: u64) {
        self.value.set(value & width_mask(self.width))
    }
}

impl PartialEq for Port {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl Debug for Port {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Port({}:{})", self.width, self.value.get())
    }
}

/// A component handle reserved before its producer exists, used to wire feedback loops.
#[derive(Clone, Debug, PartialEq)]
pub enum Placeholder {
    Unresolved { width: usize },
    Resolved(Vec<Connection>),
}

impl Placeholder {
    pub fn width(&self) -> usize {
        match self {
            Placeholder::Unresolved { width } => *width,
            Placeholder::Resolved(bus) => bus.len(),
        }
    }
}

/// Every kind of node an [Ic] arena can hold.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    /// Boundary of the IC owning the arena.
    Root,
    Constant(bool),
    Clock,
    Nand,
    Dff,
    Rom(Memory),
    Ram(Memory),
    Input(Port),
    Output(Port),
    Ic(Box<Ic>),
    Forward(Placeholder),
}

use Component::*;

/// Pin name and width pairs.
pub type PinWidths<'a> = SmallVec<[(&'a str, usize); 3]>;

impl Component {
    /// Returns the [PrimitiveKind] of `self`, None for composites and pseudo components.
    pub fn kind(&self) -> Option<PrimitiveKind> {
        match self {
            Nand => Some(PrimitiveKind::Nand),
            Dff => Some(PrimitiveKind::Dff),
            Rom(_) => Some(PrimitiveKind::Rom),
            Ram(_) => Some(PrimitiveKind::Ram),
            Input(_) => Some(PrimitiveKind::Input),
            Output(_) => Some(PrimitiveKind::Output),
            Root | Constant(_) | Clock | Component::Ic(_) | Forward(_) => None,
        }
    }

    /// Returns the name used in human readable labels.
    pub fn name(&self) -> &str {
        match self {
            Root => "Root",
            Constant(false) => "OFF",
            Constant(true) => "ON",
            Clock => "Clock",
            Nand => "Nand",
            Dff => "Dff",
            Rom(_) => "Rom",
            Ram(_) => "Ram",
            Input(_) => "Input",
            Output(_) => "Output",
            Component::Ic(ic) => ic.label(),
            Forward(_) => "Forward",
        }
    }

    /// Returns the input pins of the component and their widths.
    ///
    /// The pins of [Root] depend on the IC owning it, see [Ic::producer_width](super::Ic).
    pub fn inputs(&self) -> PinWidths<'_> {
        match self {
            Nand => smallvec![("a", 1), ("b", 1)],
            Dff => smallvec![("in", 1)],
            Rom(m) => smallvec![("address", m.address_width)],
            Ram(m) => smallvec![
                ("in", m.word_width),
                ("load", 1),
                ("address", m.address_width)
            ],
            Output(p) => smallvec![("in", p.width)],
            Component::Ic(ic) => ic.declared_inputs().collect(),
            Root | Constant(_) | Clock | Input(_) | Forward(_) => smallvec![],
        }
    }

    /// Returns the output pins of the component and their widths.
    pub fn outputs(&self) -> PinWidths<'_> {
        match self {
            Nand | Dff | Constant(_) | Clock => smallvec![("out", 1)],
            Rom(m) | Ram(m) => smallvec![("out", m.word_width)],
            Input(p) => smallvec![("out", p.width)],
            Forward(p) => smallvec![("out", p.width())],
            Component::Ic(ic) => ic.declared_outputs().collect(),
            Root | Output(_) => smallvec![],
        }
    }

    /// Returns the width of input `pin`, None if there is no such input.
    pub fn input_width(&self, pin: &str) -> Option<usize> {
        match (self, pin) {
            (Nand, "a") | (Nand, "b") | (Dff, "in") | (Ram(_), "load") => Some(1),
            (Rom(m), "address") | (Ram(m), "address") => Some(m.address_width),
            (Ram(m), "in") => Some(m.word_width),
            (Output(p), "in") => Some(p.width),
            (Component::Ic(ic), pin) => ic.declared_input_width(pin),
            _ => None,
        }
    }

    /// Returns the width of output `pin`, None if there is no such output.
    pub fn output_width(&self, pin: &str) -> Option<usize> {
        match (self, pin) {
            (Nand, "out") | (Dff, "out") | (Constant(_), "out") | (Clock, "out") => Some(1),
            (Rom(m), "out") | (Ram(m), "out") => Some(m.word_width),
            (Input(p), "out") => Some(p.width),
            (Forward(p), "out") => Some(p.width()),
            (Component::Ic(ic), pin) => ic.declared_output_width(pin),
            _ => None,
        }
    }

    /// Returns the input pins whose values the combinational behavior reads.
    ///
    /// The rest of the inputs are only read on clock edges.
    pub fn combinational_inputs(&self) -> &'static [&'static str] {
        match self {
            Nand => &["a", "b"],
            Rom(_) | Ram(_) => &["address"],
            _ => &[],
        }
    }

    /// Returns true if the component computes outputs from its inputs between clock edges.
    pub fn has_combine(&self) -> bool {
        matches!(self, Nand | Rom(_) | Ram(_) | Input(_))
    }

    /// Returns true if the component updates state on clock edges.
    pub fn is_stateful(&self) -> bool {
        matches!(self, Dff | Ram(_) | Output(_))
    }

    /// Returns true if the component is a leaf that survives flattening.
    pub fn is_primitive(&self) -> bool {
        self.kind().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_memory_shape() {
        assert!(Memory::new(4, 0).is_err());
        assert!(Memory::new(4, 65).is_err());
        assert!(Memory::new(0, 16).is_err());
        assert!(Memory::new(MAX_ADDRESS_WIDTH + 1, 16).is_err());

        let m = Memory::new(4, 64).unwrap();
        m.write(15, u64::MAX);
        assert_eq!(m.read(15), u64::MAX);
        assert_eq!(m.len(), 16);
    }

    #[test]
    fn test_memory_load() {
        let m = Memory::new(3, 4).unwrap();
        m.write(7, 9);
        m.load(vec![1, 2, 0x13]);
        assert_eq!(m.read(0), 1);
        assert_eq!(m.read(2), 3);
        assert_eq!(m.read(7), 0);
    }

    #[test]
    fn test_memory_equality_is_identity() {
        let a = Memory::new(2, 2).unwrap();
        let b = Memory::new(2, 2).unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_pins() {
        let ram = Ram(Memory::new(3, 16).unwrap());
        assert_eq!(ram.input_width("in"), Some(16));
        assert_eq!(ram.input_width("address"), Some(3));
        assert_eq!(ram.input_width("out"), None);
        assert_eq!(ram.output_width("out"), Some(16));
        assert_eq!(ram.inputs().len(), 3);
        assert!(ram.has_combine() && ram.is_stateful());

        assert!(!Dff.has_combine() && Dff.is_stateful());
        assert!(Nand.has_combine() && !Nand.is_stateful());
        assert_eq!(Nand.combinational_inputs(), &["a", "b"]);
        assert_eq!(Nand.output_width("a"), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(PrimitiveKind::iter().count(), 6);
        assert_eq!(PrimitiveKind::Nand.to_string(), "Nand");
        assert_eq!(Root.kind(), None);
        assert!(Input(Port::new(16)).is_primitive());
    }

    #[test]
    fn test_port() {
        let p = Port::new(4);
        let q = p.clone();
        p.set(0x1f);
        assert_eq!(q.get(), 0xf);
    }
}
