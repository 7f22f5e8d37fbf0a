use crate::lang::value::{Pointer, Value};
use crate::runtime::runtime_error::RuntimeError;

/// The runtime safety component.
///
/// Every operand requirement the VM has (initialization, numeric and bool
/// tags, valid heap addresses, in-range indices) is asserted here, so the
/// dispatch loop stays free of ad-hoc checks and every failure carries a
/// consistent message.
#[derive(Debug, Default, Clone)]
pub struct Guardian;

impl Guardian {
    pub fn new() -> Self {
        Guardian
    }

    /// The uninitialized sentinel may be copied and stored freely; it only
    /// fails here, at the point of an actual read.
    pub fn check_initialized(&self, value: &Value) -> Result<(), RuntimeError> {
        if matches!(value, Value::Uninit) {
            return Err(RuntimeError::UninitializedRead);
        }
        Ok(())
    }

    pub fn expect_numeric(&self, value: &Value) -> Result<(), RuntimeError> {
        self.check_initialized(value)?;
        if !value.is_numeric() {
            return Err(RuntimeError::NumericExpected {
                found: value.type_name(),
            });
        }
        Ok(())
    }

    pub fn expect_bool(&self, value: &Value) -> Result<bool, RuntimeError> {
        self.check_initialized(value)?;
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::BoolExpected {
                found: other.type_name(),
            }),
        }
    }

    pub fn expect_pointer(&self, value: &Value) -> Result<Pointer, RuntimeError> {
        self.check_initialized(value)?;
        match value {
            Value::Pointer(p) => Ok(*p),
            other => Err(RuntimeError::PointerExpected {
                found: other.type_name(),
            }),
        }
    }

    /// Validates an `alloc_arr` size operand: an int, zero or more.
    pub fn expect_array_size(&self, value: &Value) -> Result<usize, RuntimeError> {
        self.check_initialized(value)?;
        match value {
            Value::Int(n) if *n >= 0 => Ok(*n as usize),
            Value::Int(n) => Err(RuntimeError::NegativeArraySize { size: *n }),
            other => Err(RuntimeError::ArraySizeNotInteger {
                found: other.type_name(),
            }),
        }
    }

    /// Validates a subscript index operand; range checking happens later,
    /// once the array's length is known.
    pub fn expect_index(&self, value: &Value) -> Result<i64, RuntimeError> {
        self.check_initialized(value)?;
        match value {
            Value::Int(n) => Ok(*n),
            other => Err(RuntimeError::IndexNotInteger {
                found: other.type_name(),
            }),
        }
    }

    pub fn check_heap_address(&self, addr: usize, count: usize) -> Result<(), RuntimeError> {
        if addr >= count {
            return Err(RuntimeError::InvalidAddress { addr });
        }
        Ok(())
    }

    /// Range-checks an index against an array length and converts it to a
    /// usable offset.
    pub fn check_array_bounds(&self, len: usize, index: i64) -> Result<usize, RuntimeError> {
        if index < 0 || index as usize >= len {
            return Err(RuntimeError::IndexOutOfBounds { index, len });
        }
        Ok(index as usize)
    }
}
