//! Doubly linked list whose nodes live in a [`SlotArena`].
//!
//! Links are `SlotId`s rather than pointers, so handles stay valid while the
//! node is resident and every splice is safe Rust.
//!
//! ```text
//!   arena (SlotArena<Node<T>>)
//!   ┌────────┬───────────────────────────────────────────────────────┐
//!   │ SlotId │ Node { value, prev, next, epoch }                     │
//!   ├────────┼───────────────────────────────────────────────────────┤
//!   │ id_1   │ { value: A, prev: None,       next: Some(id_2), 7 }   │
//!   │ id_2   │ { value: B, prev: Some(id_1), next: Some(id_3), 4 }   │
//!   │ id_3   │ { value: C, prev: Some(id_2), next: None,       2 }   │
//!   └────────┴───────────────────────────────────────────────────────┘
//!
//!   head ─► [id_1] ◄──► [id_2] ◄──► [id_3] ◄── tail
//! ```
//!
//! Every node carries an `epoch` chosen by the caller at insertion. Slot ids
//! are recycled, the epoch is what distinguishes two successive occupants of
//! the same slot.
//!
//! `push_front`, `pop_back`, `move_to_front` and `remove` are O(1).

use crate::ds::slot_arena::{SlotArena, SlotId};

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
    epoch: u64,
}

/// List that stores nodes in a `SlotArena` and links them via `SlotId`.
#[derive(Debug)]
pub struct IntrusiveList<T> {
    arena: SlotArena<Node<T>>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
}

impl<T> IntrusiveList<T> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            arena: SlotArena::new(),
            head: None,
            tail: None,
        }
    }

    /// Creates an empty list with reserved node capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: SlotArena::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.arena.get(id).map(|node| &node.value)
    }

    /// Returns the epoch recorded for `id`, if present.
    pub fn epoch(&self, id: SlotId) -> Option<u64> {
        self.arena.get(id).map(|node| node.epoch)
    }

    /// Returns the value at `id` together with its epoch.
    pub fn get_with_epoch(&self, id: SlotId) -> Option<(&T, u64)> {
        self.arena.get(id).map(|node| (&node.value, node.epoch))
    }

    /// Inserts a new node at the front and returns its `SlotId`.
    pub fn push_front(&mut self, value: T, epoch: u64) -> SlotId {
        let id = self.arena.insert(Node {
            value,
            prev: None,
            next: None,
            epoch,
        });
        self.attach_front(id);
        id
    }

    /// Removes and returns the back value together with its epoch.
    pub fn pop_back(&mut self) -> Option<(T, u64)> {
        let id = self.tail?;
        self.remove_with_epoch(id)
    }

    /// Removes the node `id` and returns its value.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.remove_with_epoch(id).map(|(value, _)| value)
    }

    fn remove_with_epoch(&mut self, id: SlotId) -> Option<(T, u64)> {
        self.detach(id)?;
        self.arena.remove(id).map(|node| (node.value, node.epoch))
    }

    /// Moves an existing node to the front; returns `false` if `id` is not present.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !self.arena.contains(id) {
            return false;
        }
        if self.head != Some(id) {
            self.detach(id);
            self.attach_front(id);
        }
        true
    }

    /// Clears the list and frees all nodes.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterates `(SlotId, &T)` from front to back.
    pub fn iter_entries(&self) -> IntrusiveListEntryIter<'_, T> {
        IntrusiveListEntryIter {
            list: self,
            current: self.head,
        }
    }

    /// Iterates values from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter_entries().map(|(_, value)| value)
    }

    fn detach(&mut self, id: SlotId) -> Option<()> {
        let (prev, next) = {
            let node = self.arena.get(id)?;
            (node.prev, node.next)
        };

        match prev.and_then(|prev_id| self.arena.get_mut(prev_id)) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match next.and_then(|next_id| self.arena.get_mut(next_id)) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.prev = None;
            node.next = None;
        }
        Some(())
    }

    fn attach_front(&mut self, id: SlotId) {
        let old_head = self.head;
        if let Some(node) = self.arena.get_mut(id) {
            node.prev = None;
            node.next = old_head;
        } else {
            return;
        }
        match old_head.and_then(|head_id| self.arena.get_mut(head_id)) {
            Some(head_node) => head_node.prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }

    /// Walks the links and reports the first broken one.
    ///
    /// Checks that `prev`/`next` agree, that the walk visits every resident
    /// node exactly once, and that `tail` is the last node visited.
    pub fn validate_links(&self) -> Result<(), String> {
        let mut visited = 0usize;
        let mut prev = None;
        let mut current = self.head;

        while let Some(id) = current {
            let node = self
                .arena
                .get(id)
                .ok_or_else(|| format!("link to vacant slot {}", id.index()))?;
            if node.prev != prev {
                return Err(format!("slot {} has a stale prev link", id.index()));
            }
            visited += 1;
            if visited > self.len() {
                return Err("cycle in recency list".to_string());
            }
            prev = Some(id);
            current = node.next;
        }

        if self.tail != prev {
            return Err("tail does not terminate the list".to_string());
        }
        if visited != self.len() {
            return Err(format!(
                "list reaches {visited} nodes but arena holds {}",
                self.len()
            ));
        }
        Ok(())
    }
}

/// Iterator over `(SlotId, &T)` pairs from front to back.
pub struct IntrusiveListEntryIter<'a, T> {
    list: &'a IntrusiveList<T>,
    current: Option<SlotId>,
}

impl<'a, T> Iterator for IntrusiveListEntryIter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.arena.get(id)?;
        self.current = node.next;
        Some((id, &node.value))
    }
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}
