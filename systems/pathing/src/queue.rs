//! Binary heap that tracks where every node sits so priorities can be lowered
//! in place.

use std::cmp::Ordering;

/// Min-heap keyed by dense node indices with decrease-key support.
///
/// Each node's heap slot is remembered in a side table stamped with the
/// current generation, so [`IntrinsicPriorityQueue::clear`] never touches the
/// side table.
#[derive(Clone, Debug, Default)]
pub struct IntrinsicPriorityQueue {
    heap: Vec<Entry>,
    slots: Vec<Slot>,
    generation: u64,
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    node: usize,
    priority: f64,
}

impl Entry {
    fn precedes(self, other: Entry) -> bool {
        match self.priority.total_cmp(&other.priority) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.node < other.node,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    generation: u64,
    position: Option<usize>,
}

impl IntrinsicPriorityQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the queue in constant time.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    /// Number of queued nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Reports whether the queue holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Reports whether the node is currently queued.
    #[must_use]
    pub fn contains(&self, node: usize) -> bool {
        self.position(node).is_some()
    }

    /// Priority the node is queued with, if any.
    #[must_use]
    pub fn priority(&self, node: usize) -> Option<f64> {
        self.position(node)
            .and_then(|position| self.heap.get(position))
            .map(|entry| entry.priority)
    }

    /// Queues the node, or lowers its priority when it is already queued with
    /// a higher one. Returns whether the queue changed.
    pub fn push_or_decrease(&mut self, node: usize, priority: f64) -> bool {
        match self.position(node) {
            Some(position) => {
                if priority.total_cmp(&self.heap[position].priority) != Ordering::Less {
                    return false;
                }
                self.heap[position].priority = priority;
                self.sift_up(position);
                true
            }
            None => {
                self.heap.push(Entry { node, priority });
                let position = self.heap.len() - 1;
                self.set_position(node, Some(position));
                self.sift_up(position);
                true
            }
        }
    }

    /// Removes and returns the node with the lowest priority.
    ///
    /// Ties resolve toward the lower node index.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.set_position(entry.node, None);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((entry.node, entry.priority))
    }

    fn position(&self, node: usize) -> Option<usize> {
        self.slots
            .get(node)
            .filter(|slot| slot.generation == self.generation)
            .and_then(|slot| slot.position)
    }

    fn set_position(&mut self, node: usize, position: Option<usize>) {
        if node >= self.slots.len() {
            self.slots.resize(node + 1, Slot::default());
        }
        self.slots[node] = Slot {
            generation: self.generation,
            position,
        };
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        let (node_a, node_b) = (self.heap[a].node, self.heap[b].node);
        self.set_position(node_a, Some(a));
        self.set_position(node_b, Some(b));
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if !self.heap[position].precedes(self.heap[parent]) {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        loop {
            let left = position * 2 + 1;
            let right = left + 1;
            let mut best = position;
            if left < self.heap.len() && self.heap[left].precedes(self.heap[best]) {
                best = left;
            }
            if right < self.heap.len() && self.heap[right].precedes(self.heap[best]) {
                best = right;
            }
            if best == position {
                break;
            }
            self.swap(position, best);
            position = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_priority_order() {
        let mut queue = IntrinsicPriorityQueue::new();
        for (node, priority) in [(0, 5.0), (1, 1.0), (2, 3.0), (3, 4.0), (4, 2.0)] {
            assert!(queue.push_or_decrease(node, priority));
        }

        let order: Vec<_> = std::iter::from_fn(|| queue.pop().map(|(node, _)| node)).collect();
        assert_eq!(order, vec![1, 4, 2, 3, 0]);
    }

    #[test]
    fn decrease_key_reorders_in_place() {
        let mut queue = IntrinsicPriorityQueue::new();
        assert!(queue.push_or_decrease(7, 10.0));
        assert!(queue.push_or_decrease(8, 5.0));
        assert!(!queue.push_or_decrease(7, 12.0));
        assert!(queue.push_or_decrease(7, 1.0));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.priority(7), Some(1.0));
        assert_eq!(queue.pop(), Some((7, 1.0)));
        assert!(!queue.contains(7));
    }

    #[test]
    fn ties_prefer_lower_node_index() {
        let mut queue = IntrinsicPriorityQueue::new();
        assert!(queue.push_or_decrease(9, 2.0));
        assert!(queue.push_or_decrease(3, 2.0));
        assert!(queue.push_or_decrease(5, 2.0));
        assert_eq!(queue.pop().map(|(node, _)| node), Some(3));
        assert_eq!(queue.pop().map(|(node, _)| node), Some(5));
    }

    #[test]
    fn clear_forgets_previous_slots() {
        let mut queue = IntrinsicPriorityQueue::new();
        assert!(queue.push_or_decrease(2, 1.0));
        queue.clear();
        assert!(queue.is_empty());
        assert!(!queue.contains(2));
        assert!(queue.push_or_decrease(2, 4.0));
        assert_eq!(queue.pop(), Some((2, 4.0)));
    }
}
