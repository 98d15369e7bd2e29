use crate::ast::expr::{Expr, LocalVar};
use crate::ast::perm::PermAmount;
use crate::ast::position::Position;
use crate::ast::predicate::EnumVariantIndex;
use crate::ast::ty::TypeId;
use crate::borrows::Borrow;
use std::fmt;

/// How an assignment treats the permissions of its source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssignKind {
    /// Permissions stay with the source; only the value is duplicated.
    Copy,
    /// Permissions move to the target; the source place becomes inaccessible.
    Move,
    /// A read fraction is split off for the given borrow.
    SharedBorrow(Borrow),
    /// Full permission is lent out to the given borrow.
    MutableBorrow(Borrow),
    /// Assignment to a specification-only variable; no permissions involved.
    Ghost,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stmt {
    Comment(String),
    Label(String, Position),
    Inhale(Expr, Position),
    Exhale(Expr, Position),
    Assert(Expr, Position),
    MethodCall(
        String,        // method name
        Vec<Expr>,     // arguments
        Vec<LocalVar>, // targets
        Position,
    ),
    Assign(
        Expr, // target place
        Expr, // source
        AssignKind,
        Position,
    ),
    Fold(
        TypeId,
        Vec<Expr>, // predicate arguments
        PermAmount,
        Option<EnumVariantIndex>,
        Position,
    ),
    Unfold(
        TypeId,
        Vec<Expr>,
        PermAmount,
        Option<EnumVariantIndex>,
        Position,
    ),
    /// Retire the listed borrows at this point. Lowering consults the
    /// method's reborrowing DAG for the give-back order and contents.
    ExpireBorrows(Vec<Borrow>, Position),
}

impl Stmt {
    pub fn comment(text: impl Into<String>) -> Self {
        Stmt::Comment(text.into())
    }

    pub fn pos(&self) -> Option<Position> {
        match self {
            Stmt::Comment(_) => None,
            Stmt::Label(_, p)
            | Stmt::Inhale(_, p)
            | Stmt::Exhale(_, p)
            | Stmt::Assert(_, p)
            | Stmt::MethodCall(_, _, _, p)
            | Stmt::Assign(_, _, _, p)
            | Stmt::Fold(_, _, _, _, p)
            | Stmt::Unfold(_, _, _, _, p)
            | Stmt::ExpireBorrows(_, p) => Some(*p),
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Comment(text) => write!(f, "// {}", text),
            Stmt::Label(label, _) => write!(f, "label {}", label),
            Stmt::Inhale(e, _) => write!(f, "inhale {}", e),
            Stmt::Exhale(e, _) => write!(f, "exhale {}", e),
            Stmt::Assert(e, _) => write!(f, "assert {}", e),
            Stmt::MethodCall(name, args, targets, _) => {
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", target)?;
                }
                if !targets.is_empty() {
                    write!(f, " := ")?;
                }
                write!(f, "{}(", name)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Stmt::Assign(target, source, kind, _) => {
                let kind = match kind {
                    AssignKind::Copy => "copy",
                    AssignKind::Move => "move",
                    AssignKind::SharedBorrow(_) => "shared borrow",
                    AssignKind::MutableBorrow(_) => "mutable borrow",
                    AssignKind::Ghost => "ghost",
                };
                write!(f, "{} := {} ({})", target, source, kind)
            }
            Stmt::Fold(typ, args, perm, variant, _) => {
                write!(f, "fold acc({}", typ)?;
                if let Some(variant) = variant {
                    write!(f, "[{}]", variant.0)?;
                }
                write!(f, "(")?;
                write_args(f, args)?;
                write!(f, "), {})", perm)
            }
            Stmt::Unfold(typ, args, perm, variant, _) => {
                write!(f, "unfold acc({}", typ)?;
                if let Some(variant) = variant {
                    write!(f, "[{}]", variant.0)?;
                }
                write!(f, "(")?;
                write_args(f, args)?;
                write!(f, "), {})", perm)
            }
            Stmt::ExpireBorrows(borrows, _) => {
                write!(f, "expire borrows ")?;
                for (i, borrow) in borrows.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{:?}", borrow)?;
                }
                Ok(())
            }
        }
    }
}
