//! Removes fold/unfold pairs that cancel out. The encoder closes predicates
//! at block boundaries and reopens them immediately afterwards; those pairs
//! cost the backend real solver time and carry no information.

use crate::ast::Stmt;
use crate::cfg::CfgMethod;

fn is_inverse_pair(a: &Stmt, b: &Stmt) -> bool {
    match (a, b) {
        (Stmt::Fold(t1, a1, p1, v1, _), Stmt::Unfold(t2, a2, p2, v2, _))
        | (Stmt::Unfold(t1, a1, p1, v1, _), Stmt::Fold(t2, a2, p2, v2, _)) => {
            t1 == t2 && a1 == a2 && p1 == p2 && v1 == v2
        }
        _ => false,
    }
}

/// Deletes adjacent inverse pairs inside a block. A single scan with a stack
/// reaches the fixpoint: cancelling an inner pair exposes the enclosing one.
fn cancel_adjacent(stmts: Vec<Stmt>) -> Vec<Stmt> {
    let mut out: Vec<Stmt> = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        if matches!(stmt, Stmt::Fold(..) | Stmt::Unfold(..))
            && out.last().is_some_and(|prev| is_inverse_pair(prev, &stmt))
        {
            out.pop();
        } else {
            out.push(stmt);
        }
    }
    out
}

/// A fold at the end of a block cancels against an unfold at the start of
/// its sole successor, provided this block is that successor's only
/// predecessor. Other predecessors would otherwise arrive with the
/// predicate still open.
fn cancel_across_edges(method: &mut CfgMethod) {
    let mut predecessor_counts = vec![0usize; method.basic_blocks.len()];
    method.walk_successors(|_, successor| {
        for target in successor.targets() {
            predecessor_counts[target.0] += 1;
        }
    });
    // The entry has an implicit predecessor (the caller).
    predecessor_counts[method.entry_index().0] += 1;

    loop {
        let mut cancelled = None;
        method.walk_successors(|index, successor| {
            if cancelled.is_some() {
                return;
            }
            if let crate::cfg::Successor::Goto(target) = successor {
                if predecessor_counts[target.0] != 1 || *target == index {
                    return;
                }
                let last = method.basic_blocks[index].stmts.last();
                let first = method.basic_blocks[*target].stmts.first();
                if let (Some(last), Some(first)) = (last, first) {
                    if is_inverse_pair(last, first) {
                        cancelled = Some((index, *target));
                    }
                }
            }
        });
        match cancelled {
            Some((block, target)) => {
                method.basic_blocks[block].stmts.pop();
                method.basic_blocks[target].stmts.remove(0);
                // The edge may now expose another pair.
            }
            None => break,
        }
    }
}

pub fn remove_redundant_folds(mut method: CfgMethod) -> CfgMethod {
    for index in 0..method.basic_blocks.len() {
        let block = &mut method.basic_blocks[crate::cfg::CfgBlockIndex(index)];
        let stmts = std::mem::take(&mut block.stmts);
        block.stmts = cancel_adjacent(stmts);
    }
    cancel_across_edges(&mut method);
    method
}
