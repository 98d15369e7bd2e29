use crate::ast::{Expr, LocalVar, Position, Stmt};
use crate::borrows::Dag;
use crate::error::ConstructionError;
use id_collections::{id_type, Count, IdVec};
use std::io::Write;
use veil_common::util::graphviz::{self, GraphvizWriter};

#[id_type]
pub struct CfgBlockIndex(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub enum Successor {
    Return,
    Goto(CfgBlockIndex),
    /// First matching guard wins; the trailing index is the default target.
    GotoSwitch(Vec<(Expr, CfgBlockIndex)>, CfgBlockIndex),
    Unreachable,
}

impl Successor {
    pub fn targets(&self) -> Vec<CfgBlockIndex> {
        match self {
            Successor::Return | Successor::Unreachable => Vec::new(),
            Successor::Goto(target) => vec![*target],
            Successor::GotoSwitch(guarded, default) => {
                let mut targets: Vec<_> = guarded.iter().map(|(_, target)| *target).collect();
                targets.push(*default);
                targets
            }
        }
    }

    /// Rewrites every target through `f`, keeping guards untouched.
    pub fn map_targets(self, mut f: impl FnMut(CfgBlockIndex) -> CfgBlockIndex) -> Successor {
        match self {
            Successor::Return => Successor::Return,
            Successor::Unreachable => Successor::Unreachable,
            Successor::Goto(target) => Successor::Goto(f(target)),
            Successor::GotoSwitch(guarded, default) => Successor::GotoSwitch(
                guarded
                    .into_iter()
                    .map(|(guard, target)| (guard, f(target)))
                    .collect(),
                f(default),
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CfgBlock {
    pub stmts: Vec<Stmt>,
    pub successor: Successor,
}

/// One method body. Blocks are allocated densely; block 0 is the entry.
/// The method exclusively owns its blocks, statements, expressions, and
/// (when borrows occur) its reborrowing DAG.
#[derive(Clone, Debug)]
pub struct CfgMethod {
    pub name: String,
    pub formal_args: Vec<LocalVar>,
    pub formal_returns: Vec<LocalVar>,
    pub local_vars: Vec<LocalVar>,
    pub basic_blocks: IdVec<CfgBlockIndex, CfgBlock>,
    pub borrows_dag: Option<Dag>,
    pub pos: Position,
}

impl CfgMethod {
    pub fn new(
        name: impl Into<String>,
        formal_args: Vec<LocalVar>,
        formal_returns: Vec<LocalVar>,
        local_vars: Vec<LocalVar>,
        pos: Position,
    ) -> Self {
        CfgMethod {
            name: name.into(),
            formal_args,
            formal_returns,
            local_vars,
            basic_blocks: IdVec::new(),
            borrows_dag: None,
            pos,
        }
    }

    pub fn entry_index(&self) -> CfgBlockIndex {
        CfgBlockIndex(0)
    }

    pub fn block_count(&self) -> Count<CfgBlockIndex> {
        self.basic_blocks.count()
    }

    /// Allocates the next block index. The successor starts out as
    /// `Unreachable` until `set_successor` is called.
    pub fn add_block(&mut self, stmts: Vec<Stmt>) -> CfgBlockIndex {
        self.basic_blocks.push(CfgBlock {
            stmts,
            successor: Successor::Unreachable,
        })
    }

    /// Installs a successor, rejecting any target that does not name an
    /// allocated block. Allocate all blocks before wiring them up.
    pub fn set_successor(
        &mut self,
        index: CfgBlockIndex,
        successor: Successor,
    ) -> Result<(), ConstructionError> {
        let count = self.basic_blocks.len();
        if index.0 >= count {
            return Err(ConstructionError::NoSuchBlock {
                method: self.name.clone(),
                target: index,
            });
        }
        for target in successor.targets() {
            if target.0 >= count {
                return Err(ConstructionError::NoSuchBlock {
                    method: self.name.clone(),
                    target,
                });
            }
        }
        self.basic_blocks[index].successor = successor;
        Ok(())
    }

    /// Visits every statement in block index order, then statement order.
    /// This is the single traversal used by analyses, printers, and error
    /// collectors.
    pub fn walk_statements(&self, mut f: impl FnMut(CfgBlockIndex, &Stmt)) {
        for (index, block) in self.basic_blocks.iter() {
            for stmt in &block.stmts {
                f(index, stmt);
            }
        }
    }

    /// Like `walk_statements` but short-circuits on the first error.
    pub fn try_walk_statements<E>(
        &self,
        mut f: impl FnMut(CfgBlockIndex, &Stmt) -> Result<(), E>,
    ) -> Result<(), E> {
        for (index, block) in self.basic_blocks.iter() {
            for stmt in &block.stmts {
                f(index, stmt)?;
            }
        }
        Ok(())
    }

    pub fn walk_successors(&self, mut f: impl FnMut(CfgBlockIndex, &Successor)) {
        for (index, block) in self.basic_blocks.iter() {
            f(index, &block.successor);
        }
    }

    /// Graphviz rendering of the CFG for diagnostics.
    pub fn to_graphviz(&self, w: &mut impl Write) -> Result<(), graphviz::Error> {
        let mut writer = GraphvizWriter::new(4);
        writer.write_digraph(w, |w, writer| {
            let mut node_ids = Vec::with_capacity(self.basic_blocks.len());
            for (index, block) in self.basic_blocks.iter() {
                let mut label = format!("block {}\n", index.0);
                for stmt in &block.stmts {
                    label.push_str(&stmt.to_string());
                    label.push('\n');
                }
                let attrs = if index == self.entry_index() {
                    Some("shape=box, style=bold")
                } else {
                    Some("shape=box")
                };
                node_ids.push(writer.write_node(w, &label, attrs)?);
            }
            for (index, block) in self.basic_blocks.iter() {
                for target in block.successor.targets() {
                    writer.write_edge(w, node_ids[index.0], node_ids[target.0], None)?;
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn empty_method() -> CfgMethod {
        CfgMethod::new("m", vec![], vec![], vec![], Position::default())
    }

    #[test]
    fn successor_must_reference_allocated_block() {
        let mut method = empty_method();
        let b0 = method.add_block(vec![Stmt::comment("entry")]);

        let err = method
            .set_successor(b0, Successor::Goto(CfgBlockIndex(7)))
            .unwrap_err();
        assert_eq!(
            err,
            ConstructionError::NoSuchBlock {
                method: "m".to_owned(),
                target: CfgBlockIndex(7),
            }
        );

        let b1 = method.add_block(vec![]);
        method.set_successor(b0, Successor::Goto(b1)).unwrap();
        method.set_successor(b1, Successor::Return).unwrap();
    }

    #[test]
    fn walk_order_is_block_then_statement() {
        let mut method = empty_method();
        let b0 = method.add_block(vec![Stmt::comment("a"), Stmt::comment("b")]);
        let b1 = method.add_block(vec![Stmt::comment("c")]);
        method.set_successor(b0, Successor::Goto(b1)).unwrap();
        method.set_successor(b1, Successor::Return).unwrap();

        let mut seen = Vec::new();
        method.walk_statements(|index, stmt| seen.push((index.0, stmt.to_string())));
        assert_eq!(
            seen,
            vec![
                (0, "// a".to_owned()),
                (0, "// b".to_owned()),
                (1, "// c".to_owned()),
            ]
        );
    }
}
