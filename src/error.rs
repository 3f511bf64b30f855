use std::fmt::{self, Display, Formatter};

/// Static errors found while describing or flattening a netlist.
///
/// Every variant carries the human readable label of the offending signal,
/// in format "IC_LABEL/KIND#INDEX.PIN[BIT]".
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum WiringError {
    /// The pin name doesn't exist on the component, or exists in the other direction.
    UnknownPin { label: String },
    /// The bit index is outside of the declared width of the pin.
    BitOutOfRange { label: String, width: usize },
    /// The producer and the consumer are the same component.
    SelfWiring { label: String },
    /// A port with the same name has already been declared on the IC.
    DuplicatePort { label: String },
    /// Ports and placeholders must be at least 1 bit wide.
    ZeroWidth { label: String },
    /// A bus was connected to a pin of a different width.
    WidthMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
    /// A reachable consumer pin has no producer.
    Unconnected { label: String },
    /// A forward placeholder was used but never resolved.
    UnresolvedForward { label: String },
    /// A forward placeholder was resolved twice.
    AlreadyResolved { label: String },
    /// Following pass-through wires across IC boundaries never reached a producer.
    BoundaryLoop { label: String },
}

impl Display for WiringError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use WiringError::*;
        match self {
            UnknownPin { label } => write!(f, "unknown pin: {}", label),
            BitOutOfRange { label, width } => {
                write!(f, "bit out of range: {} (width {})", label, width)
            }
            SelfWiring { label } => write!(f, "component wired to itself: {}", label),
            DuplicatePort { label } => write!(f, "duplicate port: {}", label),
            ZeroWidth { label } => write!(f, "zero width: {}", label),
            WidthMismatch {
                label,
                expected,
                actual,
            } => write!(
                f,
                "width mismatch on {}: expected {} bits, got {}",
                label, expected, actual
            ),
            Unconnected { label } => write!(f, "unconnected pin: {}", label),
            UnresolvedForward { label } => write!(f, "unresolved forward reference: {}", label),
            AlreadyResolved { label } => write!(f, "forward reference resolved twice: {}", label),
            BoundaryLoop { label } => write!(f, "pass-through loop at: {}", label),
        }
    }
}

impl std::error::Error for WiringError {}

/// Every error the synthesis pipeline and the evaluator can produce.
#[derive(Debug)]
pub enum SimError {
    Wiring(WiringError),
    /// Propagation didn't reach a fixed point after `passes` passes,
    /// the circuit contains an unlatched oscillation.
    Convergence { passes: usize },
    /// A width declaration can't be synthesized, for example a memory word wider than 64 bits.
    Shape(String),
    /// `name` is not an input/output of the synthesized circuit, or `bit` is out of its range.
    UnknownSignal { name: String, bit: usize },
    Io(std::io::Error),
}

impl Display for SimError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Wiring(e) => write!(f, "wiring error: {}", e),
            SimError::Convergence { passes } => {
                write!(f, "circuit didn't stabilize after {} passes", passes)
            }
            SimError::Shape(s) => write!(f, "invalid shape: {}", s),
            SimError::UnknownSignal { name, bit } => write!(f, "unknown signal: {}[{}]", name, bit),
            SimError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Wiring(e) => Some(e),
            SimError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<WiringError> for SimError {
    fn from(e: WiringError) -> Self {
        SimError::Wiring(e)
    }
}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e)
    }
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
