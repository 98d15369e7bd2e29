//! CFG simplification: collapses chains of empty forwarding blocks and drops
//! blocks unreachable from the entry. Surviving blocks keep their relative
//! order, so the entry stays at index 0.

use crate::cfg::{CfgBlock, CfgBlockIndex, CfgMethod, Successor};
use id_collections::IdVec;

/// Follows `Goto` successors through statement-free blocks. Stops on a self
/// loop or on a block with content.
fn resolve_forward(
    blocks: &IdVec<CfgBlockIndex, CfgBlock>,
    start: CfgBlockIndex,
) -> CfgBlockIndex {
    let mut index = start;
    let mut hops = 0;
    while let Successor::Goto(target) = blocks[index].successor {
        if !blocks[index].stmts.is_empty() || target == index {
            break;
        }
        index = target;
        // A forwarding chain longer than the block count means a cycle of
        // empty blocks; any block on it is as good a representative as any.
        hops += 1;
        if hops > blocks.len() {
            break;
        }
    }
    index
}

pub fn simplify_cfg(method: CfgMethod) -> CfgMethod {
    let blocks = &method.basic_blocks;

    // Reachability over forwarded edges, starting at the entry. The entry
    // itself is never forwarded away: it anchors index 0.
    let mut reachable = vec![false; blocks.len()];
    let mut stack = vec![method.entry_index()];
    reachable[method.entry_index().0] = true;
    while let Some(index) = stack.pop() {
        for target in blocks[index].successor.targets() {
            let target = resolve_forward(blocks, target);
            if !reachable[target.0] {
                reachable[target.0] = true;
                stack.push(target);
            }
        }
    }

    let mut remap: Vec<Option<CfgBlockIndex>> = vec![None; blocks.len()];
    let mut next = 0;
    for index in 0..blocks.len() {
        if reachable[index] {
            remap[index] = Some(CfgBlockIndex(next));
            next += 1;
        }
    }

    let mut new_blocks: IdVec<CfgBlockIndex, CfgBlock> = IdVec::new();
    for (index, block) in blocks.iter() {
        if !reachable[index.0] {
            continue;
        }
        let successor = block.successor.clone().map_targets(|target| {
            let target = resolve_forward(blocks, target);
            match remap[target.0] {
                Some(new_target) => new_target,
                // Forwarded targets of reachable blocks are reachable.
                None => unreachable!("retargeted successor must survive simplification"),
            }
        });
        new_blocks.push(CfgBlock {
            stmts: block.stmts.clone(),
            successor,
        });
    }

    CfgMethod {
        basic_blocks: new_blocks,
        ..method
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ast::{Position, Stmt};

    fn method_with_blocks(blocks: Vec<(Vec<Stmt>, Successor)>) -> CfgMethod {
        let mut method = CfgMethod::new("m", vec![], vec![], vec![], Position::default());
        let indices: Vec<_> = blocks
            .iter()
            .map(|(stmts, _)| method.add_block(stmts.clone()))
            .collect();
        for (index, (_, successor)) in indices.iter().zip(blocks) {
            method.set_successor(*index, successor).unwrap();
        }
        method
    }

    #[test]
    fn unreachable_blocks_are_dropped() {
        let method = method_with_blocks(vec![
            (vec![Stmt::comment("entry")], Successor::Goto(CfgBlockIndex(2))),
            (vec![Stmt::comment("dead")], Successor::Return),
            (vec![Stmt::comment("exit")], Successor::Return),
        ]);
        let simplified = simplify_cfg(method);
        assert_eq!(simplified.block_count().to_value(), 2);
        assert_eq!(
            simplified.basic_blocks[CfgBlockIndex(0)].successor,
            Successor::Goto(CfgBlockIndex(1))
        );
        assert_eq!(
            simplified.basic_blocks[CfgBlockIndex(1)].stmts,
            vec![Stmt::comment("exit")]
        );
    }

    #[test]
    fn empty_goto_chains_are_collapsed() {
        // entry -> empty -> empty -> exit
        let method = method_with_blocks(vec![
            (vec![Stmt::comment("entry")], Successor::Goto(CfgBlockIndex(1))),
            (vec![], Successor::Goto(CfgBlockIndex(2))),
            (vec![], Successor::Goto(CfgBlockIndex(3))),
            (vec![Stmt::comment("exit")], Successor::Return),
        ]);
        let simplified = simplify_cfg(method);
        assert_eq!(simplified.block_count().to_value(), 2);
        assert_eq!(
            simplified.basic_blocks[CfgBlockIndex(0)].successor,
            Successor::Goto(CfgBlockIndex(1))
        );
        assert_eq!(
            simplified.basic_blocks[CfgBlockIndex(1)].stmts,
            vec![Stmt::comment("exit")]
        );
    }

    #[test]
    fn simplification_is_idempotent() {
        let method = method_with_blocks(vec![
            (vec![Stmt::comment("entry")], Successor::Goto(CfgBlockIndex(2))),
            (vec![Stmt::comment("dead")], Successor::Goto(CfgBlockIndex(1))),
            (vec![], Successor::Goto(CfgBlockIndex(3))),
            (vec![Stmt::comment("exit")], Successor::Return),
        ]);
        let once = simplify_cfg(method);
        let twice = simplify_cfg(once.clone());
        assert_eq!(once.basic_blocks, twice.basic_blocks);
    }

    #[test]
    fn entry_survives_even_when_empty() {
        let method = method_with_blocks(vec![
            (vec![], Successor::Goto(CfgBlockIndex(1))),
            (vec![Stmt::comment("body")], Successor::Return),
        ]);
        let simplified = simplify_cfg(method);
        assert_eq!(simplified.entry_index(), CfgBlockIndex(0));
        assert!(simplified.basic_blocks[CfgBlockIndex(0)].stmts.is_empty());
    }
}
