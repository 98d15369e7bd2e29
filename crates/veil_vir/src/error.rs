use crate::ast::{PermError, Position, Type, TypeId};
use crate::borrows::Borrow;
use crate::cfg::CfgBlockIndex;

/// Structural failures while building or checking the IR. Scoped to one
/// method; the rest of the program keeps processing.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConstructionError {
    #[error("method {method}: successor references non-existent basic block {target:?}")]
    NoSuchBlock {
        method: String,
        target: CfgBlockIndex,
    },
    #[error("no predicate registered for type {typ} (at {position})")]
    UnresolvedPredicate { typ: TypeId, position: Position },
    #[error("more than one predicate registered for type {typ}")]
    DuplicatePredicate { typ: TypeId },
    #[error("type mismatch at {position}: expected {expected}, found {found}")]
    TypeMismatch {
        expected: Type,
        found: Type,
        position: Position,
    },
    #[error(
        "enum predicate {typ} unfolded into a variant before its discriminant \
         was read (at {position})"
    )]
    UnfoldBeforeDiscriminant { typ: TypeId, position: Position },
    #[error("permission arithmetic failed at {position}: {source}")]
    Perm {
        position: Position,
        source: PermError,
    },
}

/// Inconsistencies in the reborrowing DAG. All of these make the DAG (and
/// with it the method) unusable; `Cycle` additionally signals an unsound
/// upstream borrow analysis and aborts the whole verification run.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DagError {
    #[error("borrow {0:?} recorded twice")]
    DuplicateBorrow(Borrow),
    #[error("borrow {borrow:?} reborrows unknown parent {parent:?}")]
    UnknownParent { borrow: Borrow, parent: Borrow },
    #[error("unknown borrow {0:?}")]
    UnknownBorrow(Borrow),
    #[error("edge {from:?} -> {to:?} would close a cycle")]
    Cycle { from: Borrow, to: Borrow },
    #[error("net permission transfer of borrow {borrow:?} is invalid: {source}")]
    InvalidTransfer { borrow: Borrow, source: PermError },
    #[error("borrow {borrow:?} retired while its reborrow {child:?} is still alive")]
    ChildrenAlive { borrow: Borrow, child: Borrow },
    #[error("borrow {0:?} retired twice")]
    AlreadyExpired(Borrow),
}
