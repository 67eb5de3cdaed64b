//! Deferred-body queue
//!
//! Pointer bodies are not written where the pointer appears; they follow the
//! enclosing fixed-size block. The queue holds those continuations in
//! encounter order. Draining is iterative: an entry that queues further
//! bodies (nested pointers) appends them behind everything already queued,
//! so one flush produces a breadth-first layout without recursing on the
//! call stack.

use std::collections::VecDeque;

pub(crate) struct DeferredQueue<E> {
    entries: VecDeque<E>,
    draining: bool,
}

impl<E> DeferredQueue<E> {
    pub(crate) fn new() -> Self {
        Self {
            entries: VecDeque::new(),
            draining: false,
        }
    }

    pub(crate) fn push(&mut self, entry: E) {
        self.entries.push_back(entry);
    }

    pub(crate) fn pop(&mut self) -> Option<E> {
        self.entries.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Claim the queue for draining. Returns false when a drain is already
    /// running further up the stack; the caller must then leave the entries
    /// to that drain.
    pub(crate) fn begin_drain(&mut self) -> bool {
        if self.draining {
            return false;
        }
        self.draining = true;
        true
    }

    pub(crate) fn end_drain(&mut self) {
        self.draining = false;
    }

    /// Drop every queued entry. Used after a failed drain.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
