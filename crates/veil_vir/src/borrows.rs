//! The reborrowing DAG: the partial order of borrow creation/expiry within
//! one method, and the permission transfer each borrow owes when it ends.
//!
//! Nodes live in an arena indexed by small integer ids; edges are
//! index-based adjacency lists, so cycle detection is a plain index
//! traversal and no reference cycles can form.

use crate::ast::{Expr, PermAmount, Stmt};
use crate::error::DagError;
use crate::fold::ExprWalker;
use id_collections::{id_type, IdVec};
use rustc_hash::FxHashMap;
use std::io::Write;
use veil_common::util::graphviz::{self, GraphvizWriter};

/// Method-unique identifier of one borrow-creation event. Live from its
/// creation statement until the DAG records its expiry.
#[id_type]
pub struct Borrow(pub usize);

#[id_type]
struct NodeIndex(usize);

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub borrow: Borrow,
    /// Permission expressions consumed when the borrow was created; exactly
    /// these are regained when it expires.
    pub consumed: Vec<Expr>,
    /// Creation parent when this borrow reborrows an existing one.
    pub parent: Option<Borrow>,
    /// Statements to execute on expiry (write-backs and the like), before
    /// the consumed permissions are restored.
    pub expiry_stmts: Vec<Stmt>,
    /// All borrows that must be retired before this one: creation children
    /// plus coupling dependencies.
    pub children: Vec<Borrow>,
    /// Checked sum of the permission amounts in `consumed`.
    pub net_transfer: PermAmount,
}

/// Sums every permission amount mentioned in the given expressions.
fn net_transfer(consumed: &[Expr]) -> Result<PermAmount, crate::ast::PermError> {
    struct Collector {
        total: Result<PermAmount, crate::ast::PermError>,
    }

    impl ExprWalker for Collector {
        fn walk_predicate_access_predicate(
            &mut self,
            _typ: &crate::ast::TypeId,
            arg: &Expr,
            perm: PermAmount,
            _pos: crate::ast::Position,
        ) {
            if let Ok(total) = self.total {
                self.total = total.add(perm);
            }
            self.walk(arg);
        }

        fn walk_field_access_predicate(
            &mut self,
            place: &Expr,
            perm: PermAmount,
            _pos: crate::ast::Position,
        ) {
            if let Ok(total) = self.total {
                self.total = total.add(perm);
            }
            self.walk(place);
        }
    }

    let mut collector = Collector {
        total: Ok(PermAmount::NONE),
    };
    for expr in consumed {
        collector.walk(expr);
    }
    collector.total
}

/// Builder for the reborrowing DAG. Nodes arrive in analysis-discovery
/// order; the finalized DAG is immutable. Every inconsistency is a hard
/// failure and leaves no partially-valid DAG behind.
#[derive(Clone, Debug, Default)]
pub struct DagBuilder {
    nodes: IdVec<NodeIndex, Node>,
    index_of: FxHashMap<Borrow, NodeIndex>,
}

impl DagBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(
        &mut self,
        borrow: Borrow,
        consumed: Vec<Expr>,
        parent: Option<Borrow>,
        expiry_stmts: Vec<Stmt>,
    ) -> Result<(), DagError> {
        if self.index_of.contains_key(&borrow) {
            return Err(DagError::DuplicateBorrow(borrow));
        }
        let parent_index = match parent {
            Some(parent) => Some(
                *self
                    .index_of
                    .get(&parent)
                    .ok_or(DagError::UnknownParent { borrow, parent })?,
            ),
            None => None,
        };
        let transfer = net_transfer(&consumed)
            .map_err(|source| DagError::InvalidTransfer { borrow, source })?;

        let index = self.nodes.push(Node {
            borrow,
            consumed,
            parent,
            expiry_stmts,
            children: Vec::new(),
            net_transfer: transfer,
        });
        self.index_of.insert(borrow, index);
        if let Some(parent_index) = parent_index {
            // The child is brand new, so this edge cannot close a cycle.
            self.nodes[parent_index].children.push(borrow);
        }
        Ok(())
    }

    /// Records an extra ordering constraint: `child` must be retired before
    /// `parent`. Used for coupling constraints discovered after creation.
    /// An edge that would close a cycle is rejected and the builder is left
    /// unchanged; a cycle means the upstream borrow analysis is unsound.
    pub fn add_dependency(&mut self, parent: Borrow, child: Borrow) -> Result<(), DagError> {
        let parent_index = *self
            .index_of
            .get(&parent)
            .ok_or(DagError::UnknownBorrow(parent))?;
        self.index_of
            .get(&child)
            .ok_or(DagError::UnknownBorrow(child))?;

        if self.reaches(child, parent) {
            return Err(DagError::Cycle {
                from: parent,
                to: child,
            });
        }
        let children = &mut self.nodes[parent_index].children;
        if !children.contains(&child) {
            children.push(child);
        }
        Ok(())
    }

    // Is `to` reachable from `from` along child edges?
    fn reaches(&self, from: Borrow, to: Borrow) -> bool {
        let mut stack = vec![from];
        let mut visited = vec![false; self.nodes.len()];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            let index = self.index_of[&current];
            if visited[index.0] {
                continue;
            }
            visited[index.0] = true;
            stack.extend(self.nodes[index].children.iter().copied());
        }
        false
    }

    pub fn finalize(self) -> Dag {
        Dag {
            nodes: self.nodes,
            index_of: self.index_of,
        }
    }
}

/// Finalized reborrowing DAG. Owned by the `CfgMethod` that built it and
/// read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct Dag {
    nodes: IdVec<NodeIndex, Node>,
    index_of: FxHashMap<Borrow, NodeIndex>,
}

impl Dag {
    pub fn node(&self, borrow: Borrow) -> Option<&Node> {
        self.index_of.get(&borrow).map(|index| &self.nodes[*index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 0
    }

    /// Topologically orders the given borrows for expiry: every borrow comes
    /// before any of its (transitive) parents, because a parent's restored
    /// permission may be needed to validate a child's transfer.
    pub fn expiry_order(&self, borrows: &[Borrow]) -> Result<Vec<Borrow>, DagError> {
        for borrow in borrows {
            if !self.index_of.contains_key(borrow) {
                return Err(DagError::UnknownBorrow(*borrow));
            }
        }
        let requested: Vec<bool> = {
            let mut requested = vec![false; self.nodes.len()];
            for borrow in borrows {
                requested[self.index_of[borrow].0] = true;
            }
            requested
        };

        // Iterative DFS post-order over child edges: children are emitted
        // before their parents. Roots are visited in request order, so
        // unrelated borrows keep their analysis-discovery order.
        enum Action {
            Push(NodeIndex),
            Emit(NodeIndex),
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut order = Vec::with_capacity(borrows.len());
        for borrow in borrows {
            let root = self.index_of[borrow];
            let mut stack = vec![Action::Push(root)];
            while let Some(action) = stack.pop() {
                match action {
                    Action::Push(index) => {
                        if visited[index.0] {
                            continue;
                        }
                        visited[index.0] = true;
                        stack.push(Action::Emit(index));
                        for child in &self.nodes[index].children {
                            stack.push(Action::Push(self.index_of[child]));
                        }
                    }
                    Action::Emit(index) => {
                        if requested[index.0] {
                            order.push(self.nodes[index].borrow);
                        }
                    }
                }
            }
        }
        Ok(order)
    }

    /// Starts retiring borrows one at a time.
    pub fn expiry(&self) -> Expiry<'_> {
        Expiry {
            dag: self,
            retired: vec![false; self.nodes.len()],
        }
    }

    /// Diagnostics-only graph export; not part of the semantic contract.
    pub fn to_graphviz(&self, w: &mut impl Write) -> Result<(), graphviz::Error> {
        let mut writer = GraphvizWriter::new(4);
        writer.write_digraph(w, |w, writer| {
            let mut node_ids = Vec::with_capacity(self.nodes.len());
            for (_, node) in self.nodes.iter() {
                let mut label = format!("{:?} ({})\n", node.borrow, node.net_transfer);
                for consumed in &node.consumed {
                    label.push_str(&consumed.to_string());
                    label.push('\n');
                }
                node_ids.push(writer.write_node(w, &label, None)?);
            }
            for (index, node) in self.nodes.iter() {
                for child in &node.children {
                    let child_index = self.index_of[child];
                    // Creation edges solid, coupling dependencies dashed.
                    let attrs = if self.nodes[child_index].parent == Some(node.borrow) {
                        None
                    } else {
                        Some("style=dashed")
                    };
                    writer.write_edge(w, node_ids[index.0], node_ids[child_index.0], attrs)?;
                }
            }
            Ok(())
        })
    }
}

/// Cursor retiring borrows of a finalized DAG in dependency order. A borrow
/// cannot be retired while any of its children is still alive.
#[derive(Clone, Debug)]
pub struct Expiry<'a> {
    dag: &'a Dag,
    retired: Vec<bool>,
}

impl<'a> Expiry<'a> {
    /// Retires one borrow and returns the permissions it consumed, which its
    /// lender now regains.
    pub fn retire(&mut self, borrow: Borrow) -> Result<&'a [Expr], DagError> {
        let index = *self
            .dag
            .index_of
            .get(&borrow)
            .ok_or(DagError::UnknownBorrow(borrow))?;
        if self.retired[index.0] {
            return Err(DagError::AlreadyExpired(borrow));
        }
        let node = &self.dag.nodes[index];
        for child in &node.children {
            let child_index = self.dag.index_of[child];
            if !self.retired[child_index.0] {
                return Err(DagError::ChildrenAlive {
                    borrow,
                    child: *child,
                });
            }
        }
        self.retired[index.0] = true;
        Ok(&self.dag.nodes[index].consumed)
    }

    pub fn is_retired(&self, borrow: Borrow) -> bool {
        self.dag
            .index_of
            .get(&borrow)
            .map(|index| self.retired[index.0])
            .unwrap_or(false)
    }
}
