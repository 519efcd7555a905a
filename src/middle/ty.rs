//! The source-language type algebra. These are the types the checker assigns
//! to expressions; the backend lowers them to the independent machine-type
//! algebra in `backend::ty` before emission.

use crate::middle::primitive::{FloatWidth, IntWidth, UIntWidth};

#[derive(Debug, Clone)]
pub enum SourceType {
    Int(IntWidth),
    UInt(UIntWidth),
    Float(FloatWidth),
    Bool,
    Void,
    /// *T
    Pointer(Box<SourceType>),
    /// *mut T
    MutPointer(Box<SourceType>),
    /// [T; n]
    Array {
        length: usize,
        element: Box<SourceType>,
    },
    /// (T, T, …)
    Struct {
        packed: bool,
        fields: Vec<SourceType>,
    },
    /// (f: T, g: T, …)
    StructLabeled {
        packed: bool,
        fields: Vec<(String, SourceType)>,
    },
    /// A named type together with its resolved body
    Alias {
        name: String,
        ty: Box<SourceType>,
    },
    /// A forward-declared or self-referential named type whose body is not
    /// resolved at this edge
    Stub(String),
    /// fn(T, T) -> T
    Function {
        parameters: Vec<SourceType>,
        return_type: Box<SourceType>,
    },
}

/// Equality is structural, with two exceptions: aliases compare by
/// (name, structural body) pair, and a stub is equal to any alias carrying
/// the same name (that is how forward-declared types close the loop).
impl PartialEq for SourceType {
    fn eq(&self, other: &Self) -> bool {
        use SourceType::*;

        match (self, other) {
            (Stub(a), Stub(b)) => a == b,
            (Stub(a), Alias { name, .. }) | (Alias { name, .. }, Stub(a)) => a == name,
            (Alias { name: a, ty: ta }, Alias { name: b, ty: tb }) => a == b && ta == tb,
            (Int(a), Int(b)) => a == b,
            (UInt(a), UInt(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Bool, Bool) | (Void, Void) => true,
            (Pointer(a), Pointer(b)) => a == b,
            (MutPointer(a), MutPointer(b)) => a == b,
            (
                Array {
                    length: n,
                    element: a,
                },
                Array {
                    length: m,
                    element: b,
                },
            ) => n == m && a == b,
            (
                Struct {
                    packed: p,
                    fields: a,
                },
                Struct {
                    packed: q,
                    fields: b,
                },
            ) => p == q && a == b,
            (
                StructLabeled {
                    packed: p,
                    fields: a,
                },
                StructLabeled {
                    packed: q,
                    fields: b,
                },
            ) => p == q && a == b,
            (
                Function {
                    parameters: pa,
                    return_type: ra,
                },
                Function {
                    parameters: pb,
                    return_type: rb,
                },
            ) => pa == pb && ra == rb,
            _ => false,
        }
    }
}

impl Eq for SourceType {}

impl SourceType {
    /// Follows alias edges down to the underlying structural type. Stubs stay
    /// as they are since their body lives behind the name.
    pub fn strip_alias(&self) -> &SourceType {
        let mut ty = self;
        while let SourceType::Alias { ty: inner, .. } = ty {
            ty = inner;
        }
        ty
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.strip_alias(),
            SourceType::Int(_) | SourceType::UInt(_)
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self.strip_alias(), SourceType::Float(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.strip_alias(), SourceType::Bool)
    }

    pub fn is_pointer(&self) -> bool {
        matches!(
            self.strip_alias(),
            SourceType::Pointer(_) | SourceType::MutPointer(_)
        )
    }

    pub fn is_function(&self) -> bool {
        matches!(self.strip_alias(), SourceType::Function { .. })
    }

    /// The pointed-to type, through either pointer variant
    pub fn pointee(&self) -> Option<&SourceType> {
        match self.strip_alias() {
            SourceType::Pointer(inner) | SourceType::MutPointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// Bit width of integer and float types
    pub fn bit_width(&self) -> Option<u32> {
        match self.strip_alias() {
            SourceType::Int(w) => Some(w.bits()),
            SourceType::UInt(w) => Some(w.bits()),
            SourceType::Float(w) => Some(w.bits()),
            SourceType::Bool => Some(1),
            _ => None,
        }
    }
}

impl core::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(w) => write!(f, "{w}"),
            Self::UInt(w) => write!(f, "{w}"),
            Self::Float(w) => write!(f, "{w}"),
            Self::Bool => write!(f, "bool"),
            Self::Void => write!(f, "void"),
            Self::Pointer(ty) => write!(f, "*{ty}"),
            Self::MutPointer(ty) => write!(f, "*mut {ty}"),
            Self::Array { length, element } => write!(f, "[{element}; {length}]"),
            Self::Struct { packed, fields } => {
                if *packed {
                    write!(f, "packed ")?;
                }
                write!(f, "(")?;
                for (i, ty) in fields.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ")")
            }
            Self::StructLabeled { packed, fields } => {
                if *packed {
                    write!(f, "packed ")?;
                }
                write!(f, "(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, ")")
            }
            Self::Alias { name, .. } | Self::Stub(name) => write!(f, "{name}"),
            Self::Function {
                parameters,
                return_type,
            } => {
                write!(f, "fn(")?;
                for (i, ty) in parameters.iter().enumerate() {
                    if i != 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ") -> {return_type}")
            }
        }
    }
}
