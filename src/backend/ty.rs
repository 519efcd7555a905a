//! The target-IR type algebra. Independent from the source types: widths are
//! explicit machine widths, both pointer flavors collapse into one, and
//! signedness survives only so that operations can pick their opcode — the
//! printed spelling of `u<N>` is `i<N>`.

use itertools::Itertools;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// i<N>
    Int(u32),
    /// u<N>, printed as i<N>; the signedness is carried in operations
    UInt(u32),
    /// f32 prints as `float`, f64 as `double`
    Float(u32),
    Ptr(Box<Type>),
    Array { length: usize, element: Box<Type> },
    Struct { packed: bool, fields: Vec<Type> },
    /// Degrades to a plain struct wherever field names are irrelevant
    StructLabeled {
        packed: bool,
        fields: Vec<(String, Type)>,
    },
    /// Printed as a pointer-to-function at use sites
    Fn {
        parameters: Vec<Type>,
        return_type: Box<Type>,
    },
    /// A named type with no known body
    Opaque(String),
    /// A named type; callers that need structure go through
    /// [`Type::resolve_alias`]
    Alias { name: String, ty: Box<Type> },
    Void,
}

impl Type {
    /// Strips alias wrappers down to the underlying structural type
    pub fn resolve_alias(&self) -> &Type {
        let mut ty = self;
        while let Type::Alias { ty: inner, .. } = ty {
            ty = inner;
        }
        ty
    }

    pub fn is_signed_int(&self) -> bool {
        matches!(self.resolve_alias(), Type::Int(_))
    }

    pub fn is_unsigned_int(&self) -> bool {
        matches!(self.resolve_alias(), Type::UInt(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.resolve_alias(), Type::Float(_))
    }

    /// The field types of either struct flavor
    pub fn struct_fields(&self) -> Option<Vec<&Type>> {
        match self.resolve_alias() {
            Type::Struct { fields, .. } => Some(fields.iter().collect()),
            Type::StructLabeled { fields, .. } => {
                Some(fields.iter().map(|(_, ty)| ty).collect())
            }
            _ => None,
        }
    }

    pub fn pointer_to(self) -> Type {
        Type::Ptr(Box::new(self))
    }
}

impl core::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(bits) | Self::UInt(bits) => write!(f, "i{bits}"),
            Self::Float(32) => write!(f, "float"),
            Self::Float(_) => write!(f, "double"),
            Self::Ptr(inner) => write!(f, "{inner}*"),
            Self::Array { length, element } => write!(f, "[{length} x {element}]"),
            Self::Struct { packed, fields } => {
                let body = fields.iter().map(|ty| ty.to_string()).join(", ");
                if *packed {
                    write!(f, "<{{ {body} }}>")
                } else {
                    write!(f, "{{ {body} }}")
                }
            }
            Self::StructLabeled { packed, fields } => {
                let body = fields.iter().map(|(_, ty)| ty.to_string()).join(", ");
                if *packed {
                    write!(f, "<{{ {body} }}>")
                } else {
                    write!(f, "{{ {body} }}")
                }
            }
            Self::Fn {
                parameters,
                return_type,
            } => {
                let params = parameters.iter().map(|ty| ty.to_string()).join(", ");
                write!(f, "{return_type} ({params})*")
            }
            Self::Opaque(name) | Self::Alias { name, .. } => write!(f, "%\"{name}\""),
            Self::Void => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signedness_is_invisible_in_spelling() {
        assert_eq!(Type::Int(32).to_string(), "i32");
        assert_eq!(Type::UInt(32).to_string(), "i32");
        assert_ne!(Type::Int(32), Type::UInt(32));
    }

    #[test]
    fn aggregate_spelling() {
        let pair = Type::Struct {
            packed: false,
            fields: vec![Type::Int(32), Type::Int(8).pointer_to()],
        };
        assert_eq!(pair.to_string(), "{ i32, i8* }");

        let packed = Type::Struct {
            packed: true,
            fields: vec![Type::Int(8), Type::Int(32)],
        };
        assert_eq!(packed.to_string(), "<{ i8, i32 }>");

        let arr = Type::Array {
            length: 3,
            element: Box::new(Type::Int(8)),
        };
        assert_eq!(arr.to_string(), "[3 x i8]");
    }

    #[test]
    fn function_types_print_as_pointers() {
        let fn_ty = Type::Fn {
            parameters: vec![Type::Int(32), Type::Float(64)],
            return_type: Box::new(Type::Int(32)),
        };
        assert_eq!(fn_ty.to_string(), "i32 (i32, double)*");
    }

    #[test]
    fn aliases_print_their_name() {
        let alias = Type::Alias {
            name: "P".to_owned(),
            ty: Box::new(Type::Struct {
                packed: false,
                fields: vec![Type::Int(32), Type::Int(32)],
            }),
        };
        assert_eq!(alias.to_string(), "%\"P\"");
        assert_eq!(alias.resolve_alias().to_string(), "{ i32, i32 }");
    }
}
