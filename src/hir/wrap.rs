//! Wrap-once tables.
//!
//! A semantic wrapper binds one AST node. Downstream algorithms compare
//! wrappers by identity ("same end", "same role"), so the scope that can see
//! every requester of a node owns a [`WrapTable`] keyed by the node's
//! [`NodeId`] and hands out the same `Rc` on every request.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::base::NodeId;

pub struct WrapTable<W> {
    wrapped: RefCell<FxHashMap<NodeId, Rc<W>>>,
}

impl<W> WrapTable<W> {
    pub fn new() -> Self {
        Self {
            wrapped: RefCell::new(FxHashMap::default()),
        }
    }

    /// Return the wrapper for `id`, creating it with `wrap` the first time.
    ///
    /// `wrap` runs without the table borrowed and must not wrap `id` itself.
    pub fn get_or_wrap(&self, id: NodeId, wrap: impl FnOnce() -> Rc<W>) -> Rc<W> {
        if let Some(existing) = self.wrapped.borrow().get(&id) {
            return Rc::clone(existing);
        }
        tracing::trace!("[WRAP] wrapping node {}", id);
        let fresh = wrap();
        Rc::clone(self.wrapped.borrow_mut().entry(id).or_insert(fresh))
    }

    /// The wrapper for `id`, if one was created.
    pub fn get(&self, id: NodeId) -> Option<Rc<W>> {
        self.wrapped.borrow().get(&id).cloned()
    }

    /// Number of wrappers created so far.
    pub fn len(&self) -> usize {
        self.wrapped.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrapped.borrow().is_empty()
    }
}

impl<W> Default for WrapTable<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> fmt::Debug for WrapTable<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrapTable({} wrapped)", self.len())
    }
}
