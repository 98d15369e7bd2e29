use crate::ast::perm::PermAmount;
use crate::ast::position::Position;
use crate::ast::predicate::EnumVariantIndex;
use crate::ast::ty::{Float, Type, TypeId};
use crate::borrows::Borrow;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalVar {
    pub name: String,
    pub typ: Type,
}

impl LocalVar {
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        LocalVar {
            name: name.into(),
            typ,
        }
    }
}

impl fmt::Display for LocalVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Field {
    pub name: String,
    pub typ: Type,
}

impl Field {
    pub fn new(name: impl Into<String>, typ: Type) -> Self {
        Field {
            name: name.into(),
            typ,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Float constants are stored as raw bits so that `Expr` stays `Eq`/`Hash`
/// and structural equality is exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FloatConst {
    F32(u32),
    F64(u64),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Const {
    Bool(bool),
    Int(i64),
    Float(FloatConst),
    BitVec {
        width: u32,
        value: u128,
    },
}

impl Const {
    pub fn typ(&self) -> Type {
        match self {
            Const::Bool(_) => Type::Bool,
            Const::Int(_) => Type::Int,
            Const::Float(FloatConst::F32(_)) => Type::Float(Float::F32),
            Const::Float(FloatConst::F64(_)) => Type::Float(Float::F64),
            Const::BitVec { width, .. } => Type::BitVec(*width),
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Bool(value) => write!(f, "{}", value),
            Const::Int(value) => write!(f, "{}", value),
            Const::Float(FloatConst::F32(bits)) => write!(f, "{}f32", f32::from_bits(*bits)),
            Const::Float(FloatConst::F64(bits)) => write!(f, "{}f64", f64::from_bits(*bits)),
            Const::BitVec { width, value } => write!(f, "{}bv{}", value, width),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOpKind {
    Not,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    EqCmp,
    NeCmp,
    GtCmp,
    GeCmp,
    LtCmp,
    LeCmp,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Implies,
}

impl BinOpKind {
    pub fn is_comparison(self) -> bool {
        use BinOpKind::*;
        matches!(self, EqCmp | NeCmp | GtCmp | GeCmp | LtCmp | LeCmp)
    }

    pub fn is_boolean(self) -> bool {
        use BinOpKind::*;
        matches!(self, And | Or | Implies)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CastKind {
    /// Reinterpret an unbounded integer as a bit vector of the given width.
    IntToBitVec(u32),
    /// Widen a bit vector of the given width back to an unbounded integer.
    BitVecToInt(u32),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContainerOp {
    SeqIndex(Box<Expr>, Box<Expr>),
    SeqConcat(Box<Expr>, Box<Expr>),
    SeqLen(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DomainFunc {
    pub name: String,
    pub formal_args: Vec<LocalVar>,
    pub return_type: Type,
    pub domain_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    Local(LocalVar, Position),
    Field(Box<Expr>, Field, Position),
    Const(Const, Position),
    /// Value of the sub-expression at the state labelled by the given name.
    LabelledOld(String, Box<Expr>, Position),
    /// `lhs --* rhs`: giving up `lhs` now buys back `rhs` when the attached
    /// borrow expires.
    MagicWand(Box<Expr>, Box<Expr>, Option<Borrow>, Position),
    /// `acc(P(args), perm)` for the predicate registered under the type id.
    PredicateAccessPredicate(TypeId, Box<Expr>, PermAmount, Position),
    /// `acc(place.field, perm)`; the inner expression is the place.
    FieldAccessPredicate(Box<Expr>, PermAmount, Position),
    UnaryOp(UnaryOpKind, Box<Expr>, Position),
    BinOp(BinOpKind, Box<Expr>, Box<Expr>, Position),
    ContainerOp(ContainerOp, Position),
    Cond(
        Box<Expr>, // guard
        Box<Expr>, // then
        Box<Expr>, // else
        Position,
    ),
    ForAll(Vec<LocalVar>, Box<Expr>, Position),
    LetExpr(LocalVar, Box<Expr>, Box<Expr>, Position),
    FuncApp(
        String,        // function name
        Vec<Expr>,     // arguments
        Vec<LocalVar>, // formal arguments
        Type,          // return type
        Position,
    ),
    DomainFuncApp(DomainFunc, Vec<Expr>, Position),
    Cast(CastKind, Box<Expr>, Position),
    /// `unfolding P(args) in body`, temporarily exchanging the predicate for
    /// its fields while evaluating `body`.
    Unfolding(
        TypeId,
        Vec<Expr>,
        Box<Expr>,
        PermAmount,
        Option<EnumVariantIndex>,
        Position,
    ),
}

impl Expr {
    pub fn local(var: LocalVar) -> Self {
        Expr::Local(var, Position::default())
    }

    pub fn field(self, field: Field) -> Self {
        Expr::Field(Box::new(self), field, Position::default())
    }

    pub fn const_bool(value: bool) -> Self {
        Expr::Const(Const::Bool(value), Position::default())
    }

    pub fn const_int(value: i64) -> Self {
        Expr::Const(Const::Int(value), Position::default())
    }

    pub fn eq_cmp(self, other: Expr) -> Self {
        Expr::BinOp(
            BinOpKind::EqCmp,
            Box::new(self),
            Box::new(other),
            Position::default(),
        )
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::BinOp(
            BinOpKind::And,
            Box::new(self),
            Box::new(other),
            Position::default(),
        )
    }

    pub fn implies(self, other: Expr) -> Self {
        Expr::BinOp(
            BinOpKind::Implies,
            Box::new(self),
            Box::new(other),
            Position::default(),
        )
    }

    pub fn not(self) -> Self {
        Expr::UnaryOp(UnaryOpKind::Not, Box::new(self), Position::default())
    }

    pub fn predicate_access_predicate(typ: TypeId, place: Expr, perm: PermAmount) -> Self {
        Expr::PredicateAccessPredicate(typ, Box::new(place), perm, Position::default())
    }

    pub fn field_access_predicate(place: Expr, perm: PermAmount) -> Self {
        Expr::FieldAccessPredicate(Box::new(place), perm, Position::default())
    }

    pub fn pos(&self) -> Position {
        match self {
            Expr::Local(_, p)
            | Expr::Field(_, _, p)
            | Expr::Const(_, p)
            | Expr::LabelledOld(_, _, p)
            | Expr::MagicWand(_, _, _, p)
            | Expr::PredicateAccessPredicate(_, _, _, p)
            | Expr::FieldAccessPredicate(_, _, p)
            | Expr::UnaryOp(_, _, p)
            | Expr::BinOp(_, _, _, p)
            | Expr::ContainerOp(_, p)
            | Expr::Cond(_, _, _, p)
            | Expr::ForAll(_, _, p)
            | Expr::LetExpr(_, _, _, p)
            | Expr::FuncApp(_, _, _, _, p)
            | Expr::DomainFuncApp(_, _, p)
            | Expr::Cast(_, _, p)
            | Expr::Unfolding(_, _, _, _, _, p) => *p,
        }
    }

    pub fn set_default_pos(self, pos: Position) -> Self {
        use crate::fold::{default_fold_expr, ExprFolder};

        struct DefaultPosReplacer {
            pos: Position,
        }

        impl ExprFolder for DefaultPosReplacer {
            fn fold(&mut self, e: Expr) -> Expr {
                let folded = default_fold_expr(self, e);
                folded.map_pos(|p| if p.is_default() { self.pos } else { p })
            }
        }

        DefaultPosReplacer { pos }.fold(self)
    }

    /// Rewrites only this node's position tag.
    pub fn map_pos(self, f: impl FnOnce(Position) -> Position) -> Self {
        match self {
            Expr::Local(v, p) => Expr::Local(v, f(p)),
            Expr::Field(e, fld, p) => Expr::Field(e, fld, f(p)),
            Expr::Const(c, p) => Expr::Const(c, f(p)),
            Expr::LabelledOld(l, e, p) => Expr::LabelledOld(l, e, f(p)),
            Expr::MagicWand(l, r, b, p) => Expr::MagicWand(l, r, b, f(p)),
            Expr::PredicateAccessPredicate(t, e, perm, p) => {
                Expr::PredicateAccessPredicate(t, e, perm, f(p))
            }
            Expr::FieldAccessPredicate(e, perm, p) => Expr::FieldAccessPredicate(e, perm, f(p)),
            Expr::UnaryOp(op, e, p) => Expr::UnaryOp(op, e, f(p)),
            Expr::BinOp(op, l, r, p) => Expr::BinOp(op, l, r, f(p)),
            Expr::ContainerOp(op, p) => Expr::ContainerOp(op, f(p)),
            Expr::Cond(g, t, e, p) => Expr::Cond(g, t, e, f(p)),
            Expr::ForAll(vars, body, p) => Expr::ForAll(vars, body, f(p)),
            Expr::LetExpr(v, def, body, p) => Expr::LetExpr(v, def, body, f(p)),
            Expr::FuncApp(name, args, formals, ret, p) => {
                Expr::FuncApp(name, args, formals, ret, f(p))
            }
            Expr::DomainFuncApp(func, args, p) => Expr::DomainFuncApp(func, args, f(p)),
            Expr::Cast(kind, e, p) => Expr::Cast(kind, e, f(p)),
            Expr::Unfolding(t, args, body, perm, variant, p) => {
                Expr::Unfolding(t, args, body, perm, variant, f(p))
            }
        }
    }

    /// Best-effort type of the expression. `None` when the type cannot be
    /// derived locally (the well-formedness pass only checks derivable
    /// types).
    pub fn get_type(&self) -> Option<Type> {
        match self {
            Expr::Local(var, _) => Some(var.typ.clone()),
            Expr::Field(_, field, _) => Some(field.typ.clone()),
            Expr::Const(c, _) => Some(c.typ()),
            Expr::LabelledOld(_, e, _) => e.get_type(),
            Expr::MagicWand(..) => Some(Type::Bool),
            Expr::PredicateAccessPredicate(..) => Some(Type::Bool),
            Expr::FieldAccessPredicate(..) => Some(Type::Bool),
            Expr::UnaryOp(UnaryOpKind::Not, _, _) => Some(Type::Bool),
            Expr::UnaryOp(UnaryOpKind::Minus, e, _) => e.get_type(),
            Expr::BinOp(op, lhs, _, _) => {
                if op.is_comparison() || op.is_boolean() {
                    Some(Type::Bool)
                } else {
                    lhs.get_type()
                }
            }
            Expr::ContainerOp(ContainerOp::SeqLen(_), _) => Some(Type::Int),
            Expr::ContainerOp(ContainerOp::SeqConcat(lhs, _), _) => lhs.get_type(),
            Expr::ContainerOp(ContainerOp::SeqIndex(seq, _), _) => match seq.get_type() {
                Some(Type::Seq(elem)) => Some(*elem),
                _ => None,
            },
            Expr::Cond(_, then, _, _) => then.get_type(),
            Expr::ForAll(..) => Some(Type::Bool),
            Expr::LetExpr(_, _, body, _) => body.get_type(),
            Expr::FuncApp(_, _, _, return_type, _) => Some(return_type.clone()),
            Expr::DomainFuncApp(func, _, _) => Some(func.return_type.clone()),
            Expr::Cast(CastKind::IntToBitVec(width), _, _) => Some(Type::BitVec(*width)),
            Expr::Cast(CastKind::BitVecToInt(_), _, _) => Some(Type::Int),
            Expr::Unfolding(_, _, body, _, _, _) => body.get_type(),
        }
    }

    /// True for variable/field chains, the only expressions a predicate
    /// instance can be rooted at.
    pub fn is_place(&self) -> bool {
        match self {
            Expr::Local(..) => true,
            Expr::Field(base, _, _) => base.is_place(),
            Expr::LabelledOld(_, e, _) => e.is_place(),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Local(var, _) => write!(f, "{}", var),
            Expr::Field(base, field, _) => write!(f, "{}.{}", base, field),
            Expr::Const(c, _) => write!(f, "{}", c),
            Expr::LabelledOld(label, e, _) => write!(f, "old[{}]({})", label, e),
            Expr::MagicWand(lhs, rhs, borrow, _) => match borrow {
                Some(borrow) => write!(f, "({} --*[{:?}] {})", lhs, borrow, rhs),
                None => write!(f, "({} --* {})", lhs, rhs),
            },
            Expr::PredicateAccessPredicate(typ, place, perm, _) => {
                write!(f, "acc({}({}), {})", typ, place, perm)
            }
            Expr::FieldAccessPredicate(place, perm, _) => write!(f, "acc({}, {})", place, perm),
            Expr::UnaryOp(UnaryOpKind::Not, e, _) => write!(f, "!({})", e),
            Expr::UnaryOp(UnaryOpKind::Minus, e, _) => write!(f, "-({})", e),
            Expr::BinOp(op, lhs, rhs, _) => {
                let op = match op {
                    BinOpKind::EqCmp => "==",
                    BinOpKind::NeCmp => "!=",
                    BinOpKind::GtCmp => ">",
                    BinOpKind::GeCmp => ">=",
                    BinOpKind::LtCmp => "<",
                    BinOpKind::LeCmp => "<=",
                    BinOpKind::Add => "+",
                    BinOpKind::Sub => "-",
                    BinOpKind::Mul => "*",
                    BinOpKind::Div => "/",
                    BinOpKind::Mod => "%",
                    BinOpKind::And => "&&",
                    BinOpKind::Or => "||",
                    BinOpKind::Implies => "==>",
                };
                write!(f, "({} {} {})", lhs, op, rhs)
            }
            Expr::ContainerOp(ContainerOp::SeqIndex(seq, idx), _) => write!(f, "{}[{}]", seq, idx),
            Expr::ContainerOp(ContainerOp::SeqConcat(lhs, rhs), _) => {
                write!(f, "({} ++ {})", lhs, rhs)
            }
            Expr::ContainerOp(ContainerOp::SeqLen(seq), _) => write!(f, "|{}|", seq),
            Expr::Cond(guard, then, els, _) => write!(f, "({} ? {} : {})", guard, then, els),
            Expr::ForAll(vars, body, _) => {
                write!(f, "forall ")?;
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", var.name, var.typ)?;
                }
                write!(f, " :: {}", body)
            }
            Expr::LetExpr(var, def, body, _) => {
                write!(f, "(let {} == ({}) in {})", var.name, def, body)
            }
            Expr::FuncApp(name, args, _, _, _) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::DomainFuncApp(func, args, _) => {
                write!(f, "{}(", func.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Cast(CastKind::IntToBitVec(width), e, _) => write!(f, "bv{}({})", width, e),
            Expr::Cast(CastKind::BitVecToInt(_), e, _) => write!(f, "int({})", e),
            Expr::Unfolding(typ, args, body, perm, _, _) => {
                write!(f, "(unfolding acc({}(", typ)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, "), {}) in {})", perm, body)
            }
        }
    }
}
