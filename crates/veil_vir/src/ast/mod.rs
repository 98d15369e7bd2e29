pub mod expr;
pub mod perm;
pub mod position;
pub mod predicate;
pub mod stmt;
pub mod ty;

pub use expr::{
    BinOpKind, CastKind, Const, ContainerOp, DomainFunc, Expr, Field, FloatConst, LocalVar,
    UnaryOpKind,
};
pub use perm::{PermAmount, PermError};
pub use position::Position;
pub use predicate::{EnumPredicate, EnumVariantIndex, Predicate, StructPredicate};
pub use stmt::{AssignKind, Stmt};
pub use ty::{Float, Type, TypeId};

use once_cell::sync::Lazy;

/// Fields every encoded program uses to wrap primitive values inside a
/// `TypedRef`. The front end refers to them by name.
pub static VALUE_FIELDS: Lazy<Vec<Field>> = Lazy::new(|| {
    vec![
        Field::new("val_bool", Type::Bool),
        Field::new("val_int", Type::Int),
    ]
});

/// The reference value field; unlike the primitive value fields its type
/// depends on the pointee.
pub fn val_ref_field(target: impl Into<String>) -> Field {
    Field::new("val_ref", Type::typed_ref(target))
}

/// Name of the ghost field holding an enum's discriminant. Reads of this
/// field gate enum predicate unfolding.
pub const DISCRIMINANT_FIELD: &str = "discriminant";

#[derive(Clone, Debug, PartialEq)]
pub struct DomainAxiom {
    pub name: String,
    pub expr: Expr,
    pub domain_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Domain {
    pub name: String,
    pub functions: Vec<DomainFunc>,
    pub axioms: Vec<DomainAxiom>,
}

/// A pure, side-effect free function usable inside assertions.
#[derive(Clone, Debug, PartialEq)]
pub struct Function {
    pub name: String,
    pub formal_args: Vec<LocalVar>,
    pub return_type: Type,
    pub pres: Vec<Expr>,
    pub posts: Vec<Expr>,
    pub body: Option<Expr>,
    pub pos: Position,
}

/// A method the program may call but whose body is not verified here:
/// only the contract is known.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodStub {
    pub name: String,
    pub formal_args: Vec<LocalVar>,
    pub formal_returns: Vec<LocalVar>,
    pub pres: Vec<Expr>,
    pub posts: Vec<Expr>,
    pub pos: Position,
}
