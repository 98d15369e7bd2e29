//! Removes assertions that cannot fail: literal `assert true`, and pure
//! asserts whose exact expression already succeeded on every path reaching
//! them.
//! The second kind shows up when the encoder re-checks a contract clause
//! both at a call site and at the start of the inlined postcondition block.

use crate::ast::{Const, Expr, PermAmount, Position, Stmt};
use crate::cfg::CfgMethod;
use crate::fold::ExprWalker;
use im_rc::OrdSet;

fn is_true_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Const(Const::Bool(true), _))
}

/// Only pure boolean expressions can be cached: an assert that mentions
/// permissions (access predicates, wands, unfoldings) can succeed once and
/// fail later after a fold or exhale moved the permission away.
fn is_pure(expr: &Expr) -> bool {
    struct Purity {
        pure: bool,
    }

    impl ExprWalker for Purity {
        fn walk_predicate_access_predicate(
            &mut self,
            _typ: &crate::ast::TypeId,
            _arg: &Expr,
            _perm: PermAmount,
            _pos: Position,
        ) {
            self.pure = false;
        }

        fn walk_field_access_predicate(&mut self, _place: &Expr, _perm: PermAmount, _pos: Position) {
            self.pure = false;
        }

        fn walk_magic_wand(
            &mut self,
            _lhs: &Expr,
            _rhs: &Expr,
            _borrow: Option<crate::borrows::Borrow>,
            _pos: Position,
        ) {
            self.pure = false;
        }

        fn walk_unfolding(
            &mut self,
            _typ: &crate::ast::TypeId,
            _args: &[Expr],
            _body: &Expr,
            _perm: PermAmount,
            _variant: Option<crate::ast::EnumVariantIndex>,
            _pos: Position,
        ) {
            self.pure = false;
        }
    }

    let mut walker = Purity { pure: true };
    walker.walk(expr);
    walker.pure
}

/// Facts are keyed by rendered expression; rendering is injective enough
/// here since positions are not printed and equal renderings of pure
/// expressions assert the same thing.
type Facts = OrdSet<String>;

/// Statements that can change the heap or local state invalidate all
/// remembered facts. Fold and unfold only repackage permissions without
/// touching values, so the (pure) facts survive them.
fn invalidates_facts(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Assign(..)
            | Stmt::MethodCall(..)
            | Stmt::Inhale(..)
            | Stmt::Exhale(..)
            | Stmt::ExpireBorrows(..)
    )
}

fn transfer(mut facts: Facts, stmt: &Stmt) -> Facts {
    if invalidates_facts(stmt) {
        return Facts::default();
    }
    if let Stmt::Assert(expr, _) = stmt {
        if is_pure(expr) {
            facts.insert(expr.to_string());
        }
    }
    facts
}

pub fn remove_trivial_assertions(mut method: CfgMethod) -> CfgMethod {
    let block_count = method.basic_blocks.len();

    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); block_count];
    method.walk_successors(|index, successor| {
        for target in successor.targets() {
            predecessors[target.0].push(index.0);
        }
    });

    // Forward must-analysis: a fact holds at block entry iff it holds at the
    // exit of every predecessor. `None` is the unvisited top element, so
    // intersection with it is the identity.
    let mut exit_facts: Vec<Option<Facts>> = vec![None; block_count];
    let mut changed = true;
    while changed {
        changed = false;
        for (index, block) in method.basic_blocks.iter() {
            let entry = entry_facts(&predecessors[index.0], &exit_facts, index.0 == 0);
            let exit = block.stmts.iter().fold(entry, transfer);
            if exit_facts[index.0].as_ref() != Some(&exit) {
                exit_facts[index.0] = Some(exit);
                changed = true;
            }
        }
    }

    let mut entries: Vec<Facts> = Vec::with_capacity(block_count);
    for index in 0..block_count {
        entries.push(entry_facts(&predecessors[index], &exit_facts, index == 0));
    }

    for index in 0..block_count {
        let block = &mut method.basic_blocks[crate::cfg::CfgBlockIndex(index)];
        let mut facts = entries[index].clone();
        let stmts = std::mem::take(&mut block.stmts);
        block.stmts = stmts
            .into_iter()
            .filter_map(|stmt| {
                let keep = match &stmt {
                    Stmt::Assert(expr, _) => {
                        !is_true_literal(expr) && !facts.contains(&expr.to_string())
                    }
                    _ => true,
                };
                facts = transfer(std::mem::take(&mut facts), &stmt);
                keep.then_some(stmt)
            })
            .collect();
    }
    method
}

fn entry_facts(predecessors: &[usize], exit_facts: &[Option<Facts>], is_entry: bool) -> Facts {
    if is_entry {
        return Facts::default();
    }
    let mut entry: Option<Facts> = None;
    for &pred in predecessors {
        if let Some(pred_exit) = &exit_facts[pred] {
            entry = Some(match entry {
                None => pred_exit.clone(),
                Some(current) => current.intersection(pred_exit.clone()),
            });
        }
    }
    entry.unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{AssignKind, LocalVar, Position, Type};
    use crate::cfg::Successor;

    fn assert_stmt(expr: Expr) -> Stmt {
        Stmt::Assert(expr, Position::default())
    }

    fn x_positive() -> Expr {
        let x = Expr::local(LocalVar::new("x", Type::Int));
        Expr::BinOp(
            crate::ast::BinOpKind::GtCmp,
            Box::new(x),
            Box::new(Expr::const_int(0)),
            Position::default(),
        )
    }

    #[test]
    fn literal_true_assert_is_removed() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![
            assert_stmt(Expr::const_bool(true)),
            Stmt::comment("kept"),
        ]);
        method.set_successor(b0, Successor::Return).unwrap();
        let method = remove_trivial_assertions(method);
        assert_eq!(method.basic_blocks[b0].stmts, vec![Stmt::comment("kept")]);
    }

    #[test]
    fn repeated_assert_in_same_block_is_removed() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![assert_stmt(x_positive()), assert_stmt(x_positive())]);
        method.set_successor(b0, Successor::Return).unwrap();
        let method = remove_trivial_assertions(method);
        assert_eq!(method.basic_blocks[b0].stmts.len(), 1);
    }

    #[test]
    fn assignment_invalidates_earlier_asserts() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let assign = Stmt::Assign(
            Expr::local(LocalVar::new("x", Type::Int)),
            Expr::const_int(-1),
            AssignKind::Copy,
            Position::default(),
        );
        let b0 = method.add_block(vec![
            assert_stmt(x_positive()),
            assign,
            assert_stmt(x_positive()),
        ]);
        method.set_successor(b0, Successor::Return).unwrap();
        let method = remove_trivial_assertions(method);
        assert_eq!(method.basic_blocks[b0].stmts.len(), 3);
    }

    #[test]
    fn permission_assert_survives_fold() {
        // assert acc(x.f); fold T(x); assert acc(x.f) — the fold consumed
        // the field permission, so the second assert is not redundant.
        let place = Expr::local(LocalVar::new("x", Type::typed_ref("T")));
        let acc = Expr::field_access_predicate(
            place
                .clone()
                .field(crate::ast::Field::new("f", Type::Int)),
            PermAmount::WRITE,
        );
        let fold = Stmt::Fold(
            crate::ast::TypeId::new("T"),
            vec![place],
            PermAmount::WRITE,
            None,
            Position::default(),
        );
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![assert_stmt(acc.clone()), fold, assert_stmt(acc)]);
        method.set_successor(b0, Successor::Return).unwrap();

        let method = remove_trivial_assertions(method);
        assert_eq!(method.basic_blocks[b0].stmts.len(), 3);
    }

    #[test]
    fn fact_must_hold_on_every_incoming_path() {
        // b0 branches to b1 (asserts) and b2 (does not); both join in b3.
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![]);
        let b1 = method.add_block(vec![assert_stmt(x_positive())]);
        let b2 = method.add_block(vec![Stmt::comment("no check")]);
        let b3 = method.add_block(vec![assert_stmt(x_positive())]);
        method
            .set_successor(b0, Successor::GotoSwitch(vec![(Expr::const_bool(true), b1)], b2))
            .unwrap();
        method.set_successor(b1, Successor::Goto(b3)).unwrap();
        method.set_successor(b2, Successor::Goto(b3)).unwrap();
        method.set_successor(b3, Successor::Return).unwrap();

        let method = remove_trivial_assertions(method);
        assert_eq!(method.basic_blocks[b3].stmts.len(), 1);
    }

    #[test]
    fn fact_established_on_all_paths_removes_join_assert() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![]);
        let b1 = method.add_block(vec![assert_stmt(x_positive())]);
        let b2 = method.add_block(vec![assert_stmt(x_positive())]);
        let b3 = method.add_block(vec![assert_stmt(x_positive())]);
        method
            .set_successor(b0, Successor::GotoSwitch(vec![(Expr::const_bool(true), b1)], b2))
            .unwrap();
        method.set_successor(b1, Successor::Goto(b3)).unwrap();
        method.set_successor(b2, Successor::Goto(b3)).unwrap();
        method.set_successor(b3, Successor::Return).unwrap();

        let method = remove_trivial_assertions(method);
        assert!(method.basic_blocks[b3].stmts.is_empty());
    }
}
