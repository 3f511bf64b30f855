use std::fmt::{self, Display, Formatter};
use std::rc::Rc;

/// Name of a component pin or IC port.
pub type PinName = Rc<str>;

/// Represents the index of a component in the arena of an [Ic](super::Ic).
///
/// Indexes are assigned at insertion time and never change while the IC is being built.
#[repr(transparent)]
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub struct ComponentIndex {
    pub(super) idx: usize,
}

/// Returns a new ComponentIndex from a provided usize.
macro_rules! ci {
    ( $x:expr ) => {{
        ComponentIndex::new($x)
    }};
}

/// The [ComponentIndex] of the boundary of every [Ic](super::Ic).
///
/// Through it, the declared inputs of the IC behave as outputs and the declared outputs as inputs.
pub const ROOT: ComponentIndex = ci!(0);
/// The [ComponentIndex] of the constant 0 in every [Ic](super::Ic).
pub const OFF: ComponentIndex = ci!(1);
/// The [ComponentIndex] of the constant 1 in every [Ic](super::Ic).
pub const ON: ComponentIndex = ci!(2);
/// The [ComponentIndex] of the global clock in every [Ic](super::Ic).
pub const CLOCK: ComponentIndex = ci!(3);

/// Number of pseudo components every arena starts with.
pub(crate) const SPECIAL_COMPONENTS: usize = 4;

impl ComponentIndex {
    /// Returns a new ComponentIndex from a provided usize.
    pub(crate) const fn new(idx: usize) -> ComponentIndex {
        ComponentIndex { idx }
    }

    /// Returns the position of the component in its arena.
    pub fn idx(&self) -> usize {
        self.idx
    }

    /// Returns true if `self` is [ROOT].
    pub fn is_root(&self) -> bool {
        *self == ROOT
    }

    /// Returns true if `self` is [ON] or [OFF].
    #[inline(always)]
    pub fn is_const(&self) -> bool {
        *self == OFF || *self == ON
    }

    /// Returns true if `self` is one of [ROOT], [OFF], [ON] or [CLOCK].
    #[inline(always)]
    pub fn is_special(&self) -> bool {
        self.idx < SPECIAL_COMPONENTS
    }

    /// Returns Some(OFF) if `self` is ON, Some(ON) if `self` is OFF, None otherwise.
    ///
    /// # Example
    /// ```
    /// # use nandsim::{ON, OFF, ROOT};
    /// assert_eq!(ON.opposite_if_const(), Some(OFF));
    /// assert_eq!(OFF.opposite_if_const(), Some(ON));
    /// assert_eq!(ROOT.opposite_if_const(), None);
    /// ```
    pub fn opposite_if_const(&self) -> Option<ComponentIndex> {
        match *self {
            ON => Some(OFF),
            OFF => Some(ON),
            _ => None,
        }
    }
}

impl Display for ComponentIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.idx)
    }
}

/// Identifies exactly one boolean signal: a bit of a pin of a component.
///
/// Used as a wiring endpoint while building, and as the key of a signal after synthesis.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Connection {
    pub component: ComponentIndex,
    pub pin: PinName,
    pub bit: usize,
}

impl Connection {
    pub fn new<S: Into<PinName>>(component: ComponentIndex, pin: S, bit: usize) -> Self {
        Connection {
            component,
            pin: pin.into(),
            bit,
        }
    }

    /// Returns a copy of `self` moved to another component.
    pub(crate) fn moved_to(&self, component: ComponentIndex) -> Self {
        Connection {
            component,
            pin: self.pin.clone(),
            bit: self.bit,
        }
    }
}

/// Lets a single signal be passed anywhere a bus is expected.
impl AsRef<[Connection]> for Connection {
    fn as_ref(&self) -> &[Connection] {
        std::slice::from_ref(self)
    }
}

impl Display for Connection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}[{}]", self.component, self.pin, self.bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specials() {
        assert!(ROOT.is_root());
        assert!(ROOT.is_special() && OFF.is_special() && ON.is_special() && CLOCK.is_special());
        assert!(!ci!(SPECIAL_COMPONENTS).is_special());
        assert!(ON.is_const() && OFF.is_const());
        assert!(!CLOCK.is_const());
    }

    #[test]
    fn test_connection_as_bus() {
        let c = Connection::new(ci!(7), "out", 3);
        let bus: &[Connection] = c.as_ref();
        assert_eq!(bus.len(), 1);
        assert_eq!(bus[0], c);
        assert_eq!(c.to_string(), "#7.out[3]");
        assert_eq!(c.moved_to(ON).component, ON);
    }
}
