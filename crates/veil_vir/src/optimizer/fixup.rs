//! Late fixups run after the optimizations proper. They do not change
//! semantics; they repair metadata the earlier stages are allowed to leave
//! sloppy.

use crate::ast::{Position, Stmt};
use crate::borrows::Borrow;
use crate::cfg::CfgMethod;
use crate::fold::{default_fold_stmt, StmtFolder};
use rustc_hash::FxHashSet;

/// Replaces every default position with the method's own position, so a
/// failure inside synthesized code still points at the method it belongs
/// to instead of at line 0.
pub fn patch_positions(mut method: CfgMethod) -> CfgMethod {
    struct Patcher {
        pos: Position,
    }

    impl StmtFolder for Patcher {
        fn fold(&mut self, stmt: Stmt) -> Stmt {
            let stmt = default_fold_stmt(self, stmt);
            patch_stmt_pos(stmt, self.pos)
        }

        fn fold_expr(&mut self, e: crate::ast::Expr) -> crate::ast::Expr {
            e.set_default_pos(self.pos)
        }
    }

    let mut patcher = Patcher { pos: method.pos };
    for index in 0..method.basic_blocks.len() {
        let block = &mut method.basic_blocks[crate::cfg::CfgBlockIndex(index)];
        let stmts = std::mem::take(&mut block.stmts);
        block.stmts = stmts.into_iter().map(|stmt| patcher.fold(stmt)).collect();
    }
    method
}

fn patch_stmt_pos(stmt: Stmt, pos: Position) -> Stmt {
    let patch = |p: Position| if p.is_default() { pos } else { p };
    match stmt {
        Stmt::Comment(text) => Stmt::Comment(text),
        Stmt::Label(label, p) => Stmt::Label(label, patch(p)),
        Stmt::Inhale(e, p) => Stmt::Inhale(e, patch(p)),
        Stmt::Exhale(e, p) => Stmt::Exhale(e, patch(p)),
        Stmt::Assert(e, p) => Stmt::Assert(e, patch(p)),
        Stmt::MethodCall(name, args, targets, p) => Stmt::MethodCall(name, args, targets, patch(p)),
        Stmt::Assign(target, source, kind, p) => Stmt::Assign(target, source, kind, patch(p)),
        Stmt::Fold(typ, args, perm, variant, p) => Stmt::Fold(typ, args, perm, variant, patch(p)),
        Stmt::Unfold(typ, args, perm, variant, p) => {
            Stmt::Unfold(typ, args, perm, variant, patch(p))
        }
        Stmt::ExpireBorrows(borrows, p) => Stmt::ExpireBorrows(borrows, patch(p)),
    }
}

/// Cleans up expiration statements: drops empty ones, and within a block
/// removes repeat mentions of a borrow so each borrow is expired at most
/// once on any straight-line path. The first mention wins.
pub fn normalize_expirations(mut method: CfgMethod) -> CfgMethod {
    for index in 0..method.basic_blocks.len() {
        let block = &mut method.basic_blocks[crate::cfg::CfgBlockIndex(index)];
        let mut expired: FxHashSet<Borrow> = FxHashSet::default();
        let stmts = std::mem::take(&mut block.stmts);
        block.stmts = stmts
            .into_iter()
            .filter_map(|stmt| match stmt {
                Stmt::ExpireBorrows(borrows, pos) => {
                    let fresh: Vec<Borrow> = borrows
                        .into_iter()
                        .filter(|borrow| expired.insert(*borrow))
                        .collect();
                    if fresh.is_empty() {
                        None
                    } else {
                        Some(Stmt::ExpireBorrows(fresh, pos))
                    }
                }
                other => Some(other),
            })
            .collect();
    }
    method
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{Expr, LocalVar, Type};
    use crate::cfg::Successor;

    #[test]
    fn default_positions_are_replaced_with_method_position() {
        let method_pos = Position::new(10, 1, 77);
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], method_pos);
        let tagged = Position::new(12, 5, 78);
        let b0 = method.add_block(vec![
            Stmt::Assert(Expr::local(LocalVar::new("c", Type::Bool)), Position::default()),
            Stmt::Assert(Expr::const_bool(false), tagged),
        ]);
        method.set_successor(b0, Successor::Return).unwrap();

        let method = patch_positions(method);
        let stmts = &method.basic_blocks[b0].stmts;
        assert_eq!(stmts[0].pos(), Some(method_pos));
        match &stmts[0] {
            Stmt::Assert(e, _) => assert_eq!(e.pos(), method_pos),
            _ => unreachable!(),
        }
        // Explicit positions stay untouched.
        assert_eq!(stmts[1].pos(), Some(tagged));
    }

    #[test]
    fn position_patching_is_idempotent() {
        let method_pos = Position::new(3, 2, 9);
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], method_pos);
        let b0 = method.add_block(vec![
            Stmt::Assert(Expr::local(LocalVar::new("c", Type::Bool)), Position::default()),
            Stmt::Assert(Expr::const_bool(false), Position::new(4, 7, 10)),
        ]);
        method.set_successor(b0, Successor::Return).unwrap();

        let once = patch_positions(method);
        let twice = patch_positions(once.clone());
        assert_eq!(once.basic_blocks, twice.basic_blocks);
    }

    #[test]
    fn empty_and_duplicate_expirations_are_dropped() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![
            Stmt::ExpireBorrows(vec![], Position::default()),
            Stmt::ExpireBorrows(vec![Borrow(0), Borrow(1), Borrow(0)], Position::default()),
            Stmt::ExpireBorrows(vec![Borrow(1), Borrow(2)], Position::default()),
        ]);
        method.set_successor(b0, Successor::Return).unwrap();

        let method = normalize_expirations(method);
        let stmts = &method.basic_blocks[b0].stmts;
        assert_eq!(
            stmts,
            &vec![
                Stmt::ExpireBorrows(vec![Borrow(0), Borrow(1)], Position::default()),
                Stmt::ExpireBorrows(vec![Borrow(2)], Position::default()),
            ]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let b0 = method.add_block(vec![Stmt::ExpireBorrows(
            vec![Borrow(3), Borrow(4)],
            Position::default(),
        )]);
        method.set_successor(b0, Successor::Return).unwrap();

        let once = normalize_expirations(method);
        let twice = normalize_expirations(once.clone());
        assert_eq!(once.basic_blocks, twice.basic_blocks);
    }
}
