//! IR Operations
//!
//! The doubly linked `OpList` holding a view's create or update ops.
//!
//! Nodes live in an arena and link to each other by index, with fixed head and tail
//! sentinels. Handles (`OpId`) carry the id of the list that issued them, so splicing
//! relative to an op of another list is rejected instead of corrupting both lists.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{CompilerError, Result};
use crate::template::pipeline::ir::enums::OpKind;

/// Implemented by every op payload stored in an `OpList`.
pub trait Op {
    fn kind(&self) -> OpKind;
}

/// Handle to a node of a specific `OpList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpId {
    list: usize,
    index: usize,
}

impl OpId {
    pub fn list(&self) -> usize {
        self.list
    }
}

const HEAD: usize = 0;
const TAIL: usize = 1;

#[derive(Debug)]
struct Node<T> {
    op: Option<T>,
    prev: usize,
    next: usize,
}

static NEXT_LIST_ID: AtomicUsize = AtomicUsize::new(0);

/// A linked list of ops of a given subtype.
///
/// Removed nodes are never reused, so a handle to a removed op stays invalid.
pub struct OpList<T> {
    nodes: Vec<Node<T>>,
    len: usize,
    list_id: usize,
}

/// Lists print their ops in order. The list id only guards handle ownership, so it is left out.
impl<T: fmt::Debug> fmt::Debug for OpList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Default for OpList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OpList<T> {
    pub fn new() -> Self {
        let list_id = NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed);
        OpList {
            nodes: vec![
                Node {
                    op: None,
                    prev: HEAD,
                    next: TAIL,
                },
                Node {
                    op: None,
                    prev: HEAD,
                    next: TAIL,
                },
            ],
            len: 0,
            list_id,
        }
    }

    pub fn list_id(&self) -> usize {
        self.list_id
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> OpId {
        self.id(HEAD)
    }

    pub fn tail(&self) -> OpId {
        self.id(TAIL)
    }

    fn id(&self, index: usize) -> OpId {
        OpId {
            list: self.list_id,
            index,
        }
    }

    /// Validates a handle, allowing the sentinels only when `allow_sentinel` is set.
    fn check(&self, id: OpId, allow_sentinel: bool) -> Result<usize> {
        if id.list != self.list_id {
            return Err(CompilerError::OpListOwnership {
                expected: self.list_id,
                actual: id.list,
            });
        }
        let stale = CompilerError::StaleOp {
            list: id.list,
            index: id.index,
        };
        match id.index {
            HEAD | TAIL if allow_sentinel => Ok(id.index),
            HEAD | TAIL => Err(stale),
            index if index < self.nodes.len() && self.nodes[index].op.is_some() => Ok(index),
            _ => Err(stale),
        }
    }

    fn link_after(&mut self, at: usize, op: T) -> usize {
        let next = self.nodes[at].next;
        let index = self.nodes.len();
        self.nodes.push(Node {
            op: Some(op),
            prev: at,
            next,
        });
        self.nodes[at].next = index;
        self.nodes[next].prev = index;
        self.len += 1;
        index
    }

    fn unlink(&mut self, index: usize) -> Option<T> {
        let Node { prev, next, .. } = self.nodes[index];
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.len -= 1;
        self.nodes[index].op.take()
    }

    /// Push a new operation to the tail of the list.
    pub fn push(&mut self, op: T) -> OpId {
        let last = self.nodes[TAIL].prev;
        let index = self.link_after(last, op);
        self.id(index)
    }

    pub fn push_all(&mut self, ops: impl IntoIterator<Item = T>) {
        for op in ops {
            self.push(op);
        }
    }

    /// Prepend one or more nodes to the start of the list, keeping their order.
    pub fn prepend(&mut self, ops: impl IntoIterator<Item = T>) {
        let mut cursor = HEAD;
        for op in ops {
            cursor = self.link_after(cursor, op);
        }
    }

    pub fn insert_before(&mut self, anchor: OpId, op: T) -> Result<OpId> {
        let anchor = self.check(anchor, true)?;
        if anchor == HEAD {
            return Err(CompilerError::StaleOp {
                list: self.list_id,
                index: HEAD,
            });
        }
        let prev = self.nodes[anchor].prev;
        let index = self.link_after(prev, op);
        Ok(self.id(index))
    }

    pub fn insert_after(&mut self, anchor: OpId, op: T) -> Result<OpId> {
        let anchor = self.check(anchor, true)?;
        if anchor == TAIL {
            return Err(CompilerError::StaleOp {
                list: self.list_id,
                index: TAIL,
            });
        }
        let index = self.link_after(anchor, op);
        Ok(self.id(index))
    }

    /// Inserts `ops` in order immediately before `anchor`.
    pub fn insert_all_before(&mut self, anchor: OpId, ops: impl IntoIterator<Item = T>) -> Result<()> {
        for op in ops {
            self.insert_before(anchor, op)?;
        }
        Ok(())
    }

    pub fn remove(&mut self, id: OpId) -> Result<T> {
        let index = self.check(id, false)?;
        self.unlink(index).ok_or(CompilerError::StaleOp {
            list: id.list,
            index,
        })
    }

    /// Swaps the op at `id` for `op` in place, returning the old op.
    pub fn replace(&mut self, id: OpId, op: T) -> Result<T> {
        let index = self.check(id, false)?;
        self.nodes[index].op.replace(op).ok_or(CompilerError::StaleOp {
            list: id.list,
            index,
        })
    }

    /// Replaces the op at `id` with `ops` (possibly none), returning the old op.
    pub fn replace_with_many(&mut self, id: OpId, ops: impl IntoIterator<Item = T>) -> Result<T> {
        let index = self.check(id, false)?;
        let mut cursor = index;
        for op in ops {
            cursor = self.link_after(cursor, op);
        }
        self.unlink(index).ok_or(CompilerError::StaleOp {
            list: id.list,
            index,
        })
    }

    pub fn get(&self, id: OpId) -> Option<&T> {
        let index = self.check(id, false).ok()?;
        self.nodes[index].op.as_ref()
    }

    pub fn get_mut(&mut self, id: OpId) -> Option<&mut T> {
        let index = self.check(id, false).ok()?;
        self.nodes[index].op.as_mut()
    }

    /// The live op following `id`, if any.
    pub fn next_of(&self, id: OpId) -> Option<OpId> {
        let index = self.check(id, true).ok()?;
        if index == TAIL {
            return None;
        }
        match self.nodes[index].next {
            TAIL => None,
            next => Some(self.id(next)),
        }
    }

    /// The live op preceding `id`, if any.
    pub fn prev_of(&self, id: OpId) -> Option<OpId> {
        let index = self.check(id, true).ok()?;
        if index == HEAD {
            return None;
        }
        match self.nodes[index].prev {
            HEAD => None,
            prev => Some(self.id(prev)),
        }
    }

    fn order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.len);
        let mut cursor = self.nodes[HEAD].next;
        while cursor != TAIL {
            order.push(cursor);
            cursor = self.nodes[cursor].next;
        }
        order
    }

    /// A snapshot of the handles of all live ops, in order.
    pub fn ids(&self) -> Vec<OpId> {
        self.order().into_iter().map(|i| self.id(i)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.nodes[HEAD].next;
        std::iter::from_fn(move || {
            if cursor == TAIL {
                return None;
            }
            let node = &self.nodes[cursor];
            cursor = node.next;
            node.op.as_ref()
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let order = self.order();
        let mut slots: Vec<Option<&mut T>> = self.nodes.iter_mut().map(|n| n.op.as_mut()).collect();
        order.into_iter().filter_map(move |i| slots[i].take())
    }

    /// Iterates `(handle, op)` pairs in order.
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (OpId, &T)> + '_ {
        self.order()
            .into_iter()
            .filter_map(move |i| self.nodes[i].op.as_ref().map(|op| (self.id(i), op)))
    }

    pub fn iter_mut_with_ids(&mut self) -> impl Iterator<Item = (OpId, &mut T)> + '_ {
        let order = self.order();
        let ids: Vec<OpId> = order.iter().map(|&i| self.id(i)).collect();
        let mut slots: Vec<Option<&mut T>> = self.nodes.iter_mut().map(|n| n.op.as_mut()).collect();
        order
            .into_iter()
            .zip(ids)
            .filter_map(move |(i, id)| slots[i].take().map(|op| (id, op)))
    }

    /// Removes every op for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        for index in self.order() {
            let drop = match &self.nodes[index].op {
                Some(op) => !keep(op),
                None => false,
            };
            if drop {
                self.unlink(index);
            }
        }
    }

    /// Removes and returns all ops in order, leaving the list empty.
    pub fn take_all(&mut self) -> Vec<T> {
        let ops = self
            .order()
            .into_iter()
            .filter_map(|i| self.nodes[i].op.take())
            .collect();
        self.nodes.truncate(2);
        self.nodes[HEAD].next = TAIL;
        self.nodes[TAIL].prev = HEAD;
        self.len = 0;
        ops
    }
}

impl<T: Op> OpList<T> {
    /// The kind of the node at `id`, reporting `ListStart`/`ListEnd` for the sentinels.
    pub fn kind_at(&self, id: OpId) -> Option<OpKind> {
        match self.check(id, true).ok()? {
            HEAD => Some(OpKind::ListStart),
            TAIL => Some(OpKind::ListEnd),
            index => self.nodes[index].op.as_ref().map(Op::kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TestOp(&'static str);

    impl Op for TestOp {
        fn kind(&self) -> OpKind {
            OpKind::Statement
        }
    }

    fn names(list: &OpList<TestOp>) -> Vec<&'static str> {
        list.iter().map(|op| op.0).collect()
    }

    #[test]
    fn debug_output_shows_ops_not_list_identity() {
        let build = || {
            let mut list = OpList::new();
            list.push(TestOp("a"));
            list.push(TestOp("b"));
            list
        };
        let (first, second) = (build(), build());
        assert_ne!(first.list_id, second.list_id);
        assert_eq!(format!("{:?}", first), r#"[TestOp("a"), TestOp("b")]"#);
        assert_eq!(format!("{:?}", first), format!("{:?}", second));
    }

    #[test]
    fn push_and_prepend_preserve_order() {
        let mut list = OpList::new();
        list.push(TestOp("c"));
        list.push(TestOp("d"));
        list.prepend(vec![TestOp("a"), TestOp("b")]);
        assert_eq!(names(&list), vec!["a", "b", "c", "d"]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn insert_relative_to_anchor() {
        let mut list = OpList::new();
        let a = list.push(TestOp("a"));
        let c = list.push(TestOp("c"));
        list.insert_after(a, TestOp("b")).unwrap();
        list.insert_before(c, TestOp("bb")).unwrap();
        list.insert_before(list.tail(), TestOp("z")).unwrap();
        assert_eq!(names(&list), vec!["a", "b", "bb", "c", "z"]);
    }

    #[test]
    fn foreign_anchor_is_rejected() {
        let mut first = OpList::new();
        let mut second: OpList<TestOp> = OpList::new();
        let anchor = first.push(TestOp("a"));
        let err = second.insert_after(anchor, TestOp("b")).unwrap_err();
        assert!(matches!(err, CompilerError::OpListOwnership { .. }));
        assert!(second.is_empty());
        assert_eq!(names(&first), vec!["a"]);
    }

    #[test]
    fn removed_handle_becomes_stale() {
        let mut list = OpList::new();
        let a = list.push(TestOp("a"));
        list.push(TestOp("b"));
        assert_eq!(list.remove(a).unwrap(), TestOp("a"));
        assert!(matches!(list.remove(a), Err(CompilerError::StaleOp { .. })));
        assert!(list.get(a).is_none());
        assert_eq!(names(&list), vec!["b"]);
    }

    #[test]
    fn replace_with_many_splices_in_place() {
        let mut list = OpList::new();
        list.push(TestOp("a"));
        let b = list.push(TestOp("b"));
        list.push(TestOp("c"));
        list.replace_with_many(b, vec![TestOp("x"), TestOp("y")]).unwrap();
        assert_eq!(names(&list), vec!["a", "x", "y", "c"]);
        let ids = list.ids();
        list.replace_with_many(ids[1], Vec::new()).unwrap();
        assert_eq!(names(&list), vec!["a", "y", "c"]);
    }

    #[test]
    fn sentinels_report_list_kinds() {
        let mut list = OpList::new();
        let a = list.push(TestOp("a"));
        assert_eq!(list.kind_at(list.head()), Some(OpKind::ListStart));
        assert_eq!(list.kind_at(list.tail()), Some(OpKind::ListEnd));
        assert_eq!(list.kind_at(a), Some(OpKind::Statement));
        assert_eq!(list.next_of(a), None);
        assert_eq!(list.prev_of(a), None);
    }

    #[test]
    fn iter_mut_visits_in_list_order() {
        let mut list = OpList::new();
        list.push(TestOp("b"));
        list.prepend(vec![TestOp("a")]);
        let mut seen = Vec::new();
        for op in list.iter_mut() {
            seen.push(op.0);
            op.0 = "x";
        }
        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(names(&list), vec!["x", "x"]);
    }

    #[test]
    fn retain_and_take_all() {
        let mut list = OpList::new();
        list.push_all(vec![TestOp("a"), TestOp("b"), TestOp("c")]);
        list.retain(|op| op.0 != "b");
        assert_eq!(names(&list), vec!["a", "c"]);
        let taken = list.take_all();
        assert_eq!(taken.len(), 2);
        assert!(list.is_empty());
        list.push(TestOp("d"));
        assert_eq!(names(&list), vec!["d"]);
    }
}
