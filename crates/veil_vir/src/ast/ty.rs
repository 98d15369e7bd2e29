use std::fmt;

/// Nominal key of an encoded type. Predicate lookup in the program-wide
/// predicate table is driven by this id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(String);

impl TypeId {
    pub fn new(name: impl Into<String>) -> Self {
        TypeId(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Float {
    F32,
    F64,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Type {
    Int,
    Bool,
    Float(Float),
    /// Fixed-width bit vector; the width is in bits.
    BitVec(u32),
    Seq(Box<Type>),
    /// Reference to a structured value described by the predicate registered
    /// under the given id.
    TypedRef(TypeId),
    /// Uninterpreted sort declared by a domain.
    Domain(String),
}

impl Type {
    pub fn typed_ref(name: impl Into<String>) -> Self {
        Type::TypedRef(TypeId::new(name))
    }

    pub fn type_id(&self) -> Option<&TypeId> {
        match self {
            Type::TypedRef(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Type::TypedRef(_))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Bool => write!(f, "Bool"),
            Type::Float(Float::F32) => write!(f, "F32"),
            Type::Float(Float::F64) => write!(f, "F64"),
            Type::BitVec(width) => write!(f, "BV{}", width),
            Type::Seq(elem) => write!(f, "Seq[{}]", elem),
            Type::TypedRef(id) => write!(f, "Ref({})", id),
            Type::Domain(name) => write!(f, "{}", name),
        }
    }
}
