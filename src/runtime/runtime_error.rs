/// Upper bound of a valid index range, for out-of-range messages.
fn upper(len: &usize) -> i64 {
    *len as i64 - 1
}

/// An execution failure raised by the VM or its guardian.
///
/// The first error aborts stepping; there is no local recovery. The VM's
/// stack and heap are left untouched so the failing state can be inspected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("stack overflow: capacity {capacity} exceeded")]
    StackOverflow { capacity: usize },

    #[error("stack underflow: tried to pop from an empty operand stack")]
    StackUnderflow,

    #[error("invalid slot access: slot {slot} is out of bounds")]
    InvalidSlot { slot: usize },

    #[error("use of uninitialized value")]
    UninitializedRead,

    #[error("operand must be numeric, got {found}")]
    NumericExpected { found: &'static str },

    #[error("expected a bool, got {found}")]
    BoolExpected { found: &'static str },

    #[error("operand must be an array pointer, got {found}")]
    PointerExpected { found: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulo by zero")]
    ModuloByZero,

    #[error("array size must be an integer, got {found}")]
    ArraySizeNotInteger { found: &'static str },

    #[error("array size must be non-negative, got {size}")]
    NegativeArraySize { size: i64 },

    #[error("array index must be an integer, got {found}")]
    IndexNotInteger { found: &'static str },

    #[error("index {index} is out of range [0, {}]", upper(.len))]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("invalid heap address {addr}")]
    InvalidAddress { addr: usize },

    #[error("execution step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message_names_the_range() {
        let err = RuntimeError::IndexOutOfBounds { index: 3, len: 3 };
        assert_eq!(err.to_string(), "index 3 is out of range [0, 2]");
    }

    #[test]
    fn test_out_of_range_message_for_empty_array() {
        let err = RuntimeError::IndexOutOfBounds { index: 0, len: 0 };
        assert_eq!(err.to_string(), "index 0 is out of range [0, -1]");
    }

    #[test]
    fn test_uninitialized_message() {
        assert_eq!(
            RuntimeError::UninitializedRead.to_string(),
            "use of uninitialized value"
        );
    }
}
