use crate::ast::expr::{Expr, Field, LocalVar};
use crate::ast::ty::TypeId;
use std::fmt;

/// Index into an enum predicate's variant list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnumVariantIndex(pub usize);

/// Aggregate permission descriptor for one struct-shaped type: folding the
/// predicate trades the listed field permissions for the abstract instance,
/// unfolding trades back.
#[derive(Clone, Debug, PartialEq)]
pub struct StructPredicate {
    pub typ: TypeId,
    /// The single formal argument, conventionally named `self`.
    pub this: LocalVar,
    /// `None` marks an abstract predicate whose body is opaque to clients.
    pub body: Option<Expr>,
}

impl StructPredicate {
    pub fn new(typ: TypeId, this: LocalVar, body: Option<Expr>) -> Self {
        StructPredicate { typ, this, body }
    }
}

/// Predicate for an enum-shaped type. Each variant body is guarded by a
/// discriminant comparison; unfolding into a variant therefore requires the
/// discriminant to have been read first.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumPredicate {
    pub typ: TypeId,
    pub this: LocalVar,
    pub discriminant_field: Field,
    /// Constraint bounding the discriminant to the declared variants.
    pub discriminant_bounds: Expr,
    pub variants: Vec<(
        Expr,   // guard over the discriminant
        String, // variant name
        StructPredicate,
    )>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    Struct(StructPredicate),
    Enum(EnumPredicate),
}

impl Predicate {
    pub fn typ(&self) -> &TypeId {
        match self {
            Predicate::Struct(p) => &p.typ,
            Predicate::Enum(p) => &p.typ,
        }
    }

    pub fn this(&self) -> &LocalVar {
        match self {
            Predicate::Struct(p) => &p.this,
            Predicate::Enum(p) => &p.this,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Predicate::Enum(_))
    }

    pub fn variant(&self, index: EnumVariantIndex) -> Option<&StructPredicate> {
        match self {
            Predicate::Struct(_) => None,
            Predicate::Enum(p) => p.variants.get(index.0).map(|(_, _, body)| body),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Struct(p) => match &p.body {
                Some(body) => write!(f, "predicate {}({}) {{ {} }}", p.typ, p.this, body),
                None => write!(f, "predicate {}({})", p.typ, p.this),
            },
            Predicate::Enum(p) => {
                write!(f, "predicate {}({}) {{ {}", p.typ, p.this, p.discriminant_bounds)?;
                for (guard, name, variant) in &p.variants {
                    write!(f, " && ({} ==> [{}]", guard, name)?;
                    if let Some(body) = &variant.body {
                        write!(f, " {}", body)?;
                    }
                    write!(f, ")")?;
                }
                write!(f, " }}")
            }
        }
    }
}
