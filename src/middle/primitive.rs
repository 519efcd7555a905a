use hashbrown::HashMap;
use once_cell::sync::Lazy;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::middle::ty::SourceType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum IntWidth {
    I8,
    I16,
    I32,
    I64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum UIntWidth {
    U8,
    U16,
    U32,
    U64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum FloatWidth {
    F32,
    F64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::I8 => 8,
            IntWidth::I16 => 16,
            IntWidth::I32 => 32,
            IntWidth::I64 => 64,
        }
    }
}

impl UIntWidth {
    pub fn bits(self) -> u32 {
        match self {
            UIntWidth::U8 => 8,
            UIntWidth::U16 => 16,
            UIntWidth::U32 => 32,
            UIntWidth::U64 => 64,
        }
    }
}

impl FloatWidth {
    pub fn bits(self) -> u32 {
        match self {
            FloatWidth::F32 => 32,
            FloatWidth::F64 => 64,
        }
    }
}

/// Name table for the builtin primitive types, consulted before user-defined
/// type bindings when resolving a type name.
static BUILTIN_TYPES: Lazy<HashMap<String, SourceType>> = Lazy::new(|| {
    let mut table = HashMap::new();

    for width in IntWidth::iter() {
        table.insert(width.to_string(), SourceType::Int(width));
    }
    for width in UIntWidth::iter() {
        table.insert(width.to_string(), SourceType::UInt(width));
    }
    for width in FloatWidth::iter() {
        table.insert(width.to_string(), SourceType::Float(width));
    }

    table.insert("bool".to_owned(), SourceType::Bool);
    table.insert("void".to_owned(), SourceType::Void);

    table
});

pub fn builtin_type(name: &str) -> Option<SourceType> {
    BUILTIN_TYPES.get(name).cloned()
}
