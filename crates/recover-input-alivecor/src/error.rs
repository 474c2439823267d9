use thiserror::Error;

/// Fatal scan failures.
///
/// A report either scans fully and yields a complete recording, or the scan
/// aborts with one of these; there is no partial-success mode. Each variant
/// carries the position of the token that fired the condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScanError {
    /// A `cm` operator supplied a matrix with nonzero shear/rotation terms.
    /// The document does not match the expected template.
    #[error("unsupported transform at token {at}: matrix is not axis-aligned")]
    UnsupportedTransform { at: usize },

    /// The save/restore or drawing-order discipline of the template was
    /// violated.
    #[error("structural error at token {at}: {reason}")]
    Structural { at: usize, reason: &'static str },

    /// An operator arrived with the wrong number of pending numeric operands.
    #[error("operator '{op}' at token {at} expects {expected} operands, found {found}")]
    MalformedOperand {
        op: &'static str,
        expected: usize,
        found: usize,
        at: usize,
    },
}
