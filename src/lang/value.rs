use serde::{Deserialize, Serialize};

/// What a pointer refers to on the heap.
///
/// Arrays are the only heap-allocated objects in Cinder, but the kind tag
/// travels with the pointer so the VM can reject misuse by shape rather than
/// by address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerKind {
    Array,
}

/// An opaque heap reference: the cell's insertion index plus its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    pub addr: usize,
    pub kind: PointerKind,
}

/// Runtime value in the Cinder language.
///
/// Values are the only data that can exist on the unified stack or inside a
/// heap array cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),

    /// 64-bit floating-point number.
    Double(f64),

    /// Boolean value.
    Bool(bool),

    /// Reference to a heap array cell.
    Pointer(Pointer),

    /// A variable that was declared but never assigned.
    ///
    /// This is a real value, not a host null: it can be pushed, duplicated,
    /// stored, and loaded freely. Only reading it through an arithmetic,
    /// comparison, or condition operator is an error.
    Uninit,
}

impl Value {
    /// Convenience constructor for an array pointer.
    pub fn array(addr: usize) -> Self {
        Value::Pointer(Pointer {
            addr,
            kind: PointerKind::Array,
        })
    }

    /// Human-readable tag name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Pointer(_) => "pointer",
            Value::Uninit => "uninitialized",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Double(_))
    }
}

impl std::fmt::Display for Value {
    /// Format a value the way `print` renders it.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Pointer(p) => write!(f, "Pointer(address={})", p.addr),
            Value::Uninit => write!(f, "<uninitialized>"),
        }
    }
}

/// Element type carried by `alloc_arr` so freshly allocated arrays can be
/// filled with the right zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTag {
    Int,
    Double,
    Bool,
}

impl TypeTag {
    /// The zero value used to fill new arrays of this element type.
    pub fn zero(self) -> Value {
        match self {
            TypeTag::Int => Value::Int(0),
            TypeTag::Double => Value::Double(0.0),
            TypeTag::Bool => Value::Bool(false),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Double => "double",
            TypeTag::Bool => "bool",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_display_pointer() {
        assert_eq!(Value::array(3).to_string(), "Pointer(address=3)");
    }

    #[test]
    fn test_display_uninit() {
        assert_eq!(Value::Uninit.to_string(), "<uninitialized>");
    }

    #[test]
    fn test_equality_is_per_tag() {
        // Same tag, same payload
        assert_eq!(Value::Int(1), Value::Int(1));
        // Differing tags never compare equal, even when numerically alike
        assert_ne!(Value::Int(1), Value::Double(1.0));
        assert_ne!(Value::Bool(false), Value::Int(0));
    }

    #[test]
    fn test_zero_fill_values() {
        assert_eq!(TypeTag::Int.zero(), Value::Int(0));
        assert_eq!(TypeTag::Double.zero(), Value::Double(0.0));
        assert_eq!(TypeTag::Bool.zero(), Value::Bool(false));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Uninit.type_name(), "uninitialized");
        assert_eq!(Value::array(0).type_name(), "pointer");
    }
}
