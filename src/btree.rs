//! A page-oriented ordered set with a fixed-depth stack iterator and a
//! wildcard-capable `lower_bound`.
//!
//! Each node is sized as if it held a page's worth of `void*`-equivalent
//! slots, plus child pointers for internal nodes; splits and merges are
//! done preemptively on the way down so a single top-to-bottom walk never
//! needs a second pass back up. Each node's values live in a `Vec<T>`
//! owned by a `Box<Node<T>>` rather than a raw page: since every node has
//! exactly one owner (its parent, or the tree for the root), ordinary
//! ownership already gives the needed single-owner behavior without an
//! arena, and the degree bounds below preserve the target fan-out (see
//! `DESIGN.md`).

use crate::status::Status;
use std::cmp::Ordering;
use std::ptr::NonNull;

const PAGE_SIZE: usize = 4096;
const NODE_SPACE: usize = PAGE_SIZE - 2 * std::mem::size_of::<u16>();
/// Maximum values in a leaf node, sized as if it held `void*`-equivalent
/// slots the way the original page layout does.
const LEAF_VALS: usize = (NODE_SPACE / std::mem::size_of::<usize>()) - 1;
/// Internal nodes keep half as many values as leaves since they also need
/// room for child pointers.
const INODE_VALS: usize = LEAF_VALS / 2;
/// Enough to index a tree of `INODE_VALS`-ary fan-out up to easily
/// astronomical sizes, matching `ZIX_BTREE_MAX_HEIGHT`.
const MAX_HEIGHT: usize = 6;

struct Node<T> {
    is_leaf: bool,
    vals: Vec<T>,
    children: Vec<Box<Node<T>>>,
}

impl<T> Node<T> {
    fn leaf() -> Self {
        Node {
            is_leaf: true,
            vals: Vec::new(),
            children: Vec::new(),
        }
    }

    fn inode() -> Self {
        Node {
            is_leaf: false,
            vals: Vec::new(),
            children: Vec::new(),
        }
    }

    fn max_vals(&self) -> usize {
        if self.is_leaf { LEAF_VALS } else { INODE_VALS }
    }

    fn min_vals(&self) -> usize {
        (self.max_vals() + 1) / 2 - 1
    }

    fn is_full(&self) -> bool {
        self.vals.len() == self.max_vals()
    }

    fn can_remove_from(&self) -> bool {
        self.vals.len() > self.min_vals()
    }
}

fn find_value<T, K>(vals: &[T], key: &K, cmp: &impl Fn(&K, &T) -> Ordering) -> (usize, bool) {
    let mut first = 0usize;
    let mut count = vals.len();
    while count > 0 {
        let half = count / 2;
        let i = first + half;
        match cmp(key, &vals[i]) {
            Ordering::Equal => return (i, true),
            Ordering::Greater => {
                first += half + 1;
                count -= half + 1;
            }
            Ordering::Less => count = half,
        }
    }
    (first, false)
}

/// Like [`find_value`], but on an equal match keeps searching the left half
/// so the leftmost match is returned; lets `cmp` be a weak "wildcard"
/// ordering that isn't a strict total order, matching `lower_bound`'s
/// contract.
fn find_pattern<T, K>(vals: &[T], key: &K, cmp: &impl Fn(&K, &T) -> Ordering) -> (usize, bool) {
    let mut first = 0usize;
    let mut count = vals.len();
    let mut equal = false;
    while count > 0 {
        let half = count / 2;
        let i = first + half;
        match cmp(key, &vals[i]) {
            Ordering::Equal => {
                equal = true;
                count = half;
            }
            Ordering::Greater => {
                first += half + 1;
                count -= half + 1;
            }
            Ordering::Less => count = half,
        }
    }
    (first, equal)
}

/// Splits `parent.children[i]` (which must be full) into two nodes,
/// pushing the median value up into `parent` at index `i`.
fn split_child<T>(parent: &mut Node<T>, i: usize) {
    let (median, rhs) = {
        let lhs = &mut parent.children[i];
        debug_assert!(lhs.is_full());
        let max_n = lhs.max_vals();
        let keep = max_n / 2;
        let mut tail = lhs.vals.split_off(keep);
        let median = tail.remove(0);
        let rhs_children = if lhs.is_leaf {
            Vec::new()
        } else {
            lhs.children.split_off(keep + 1)
        };
        (
            median,
            Box::new(Node {
                is_leaf: lhs.is_leaf,
                vals: tail,
                children: rhs_children,
            }),
        )
    };
    parent.vals.insert(i, median);
    parent.children.insert(i + 1, rhs);
}

/// Steals the first value of `n.children[i + 1]` to enlarge `n.children[i]`.
fn rotate_left<T>(n: &mut Node<T>, i: usize) {
    let (left, right) = n.children.split_at_mut(i + 1);
    let lhs = &mut left[i];
    let rhs = &mut right[0];
    let stolen = rhs.vals.remove(0);
    let parent_val = std::mem::replace(&mut n.vals[i], stolen);
    lhs.vals.push(parent_val);
    if !lhs.is_leaf {
        let child0 = rhs.children.remove(0);
        lhs.children.push(child0);
    }
}

/// Steals the last value of `n.children[i - 1]` to enlarge `n.children[i]`.
fn rotate_right<T>(n: &mut Node<T>, i: usize) {
    let (left, right) = n.children.split_at_mut(i);
    let lhs = &mut left[i - 1];
    let rhs = &mut right[0];
    let stolen = lhs.vals.pop().expect("lhs has slack to steal from");
    let parent_val = std::mem::replace(&mut n.vals[i - 1], stolen);
    rhs.vals.insert(0, parent_val);
    if !lhs.is_leaf {
        let last_child = lhs.children.pop().expect("internal node has a child to move");
        rhs.children.insert(0, last_child);
    }
}

/// Moves `n.vals[i]` down and merges `n.children[i]`/`n.children[i + 1]`
/// into a single node at index `i`.
fn merge<T>(n: &mut Node<T>, i: usize) {
    let median = n.vals.remove(i);
    let mut rhs = n.children.remove(i + 1);
    let lhs = &mut n.children[i];
    lhs.vals.push(median);
    lhs.vals.append(&mut rhs.vals);
    if !rhs.children.is_empty() {
        lhs.children.append(&mut rhs.children);
    }
}

fn remove_min<T>(mut n: &mut Node<T>) -> T {
    loop {
        if n.is_leaf {
            return n.vals.remove(0);
        }
        if n.children[0].can_remove_from() {
            n = &mut n.children[0];
        } else if n.children[1].can_remove_from() {
            rotate_left(n, 0);
            n = &mut n.children[0];
        } else {
            merge(n, 0);
            n = &mut n.children[0];
        }
    }
}

fn remove_max<T>(mut n: &mut Node<T>) -> T {
    loop {
        if n.is_leaf {
            return n.vals.pop().expect("leaf eligible for removal is non-empty");
        }
        let z = n.vals.len();
        let y = z - 1;
        if n.children[z].can_remove_from() {
            n = &mut n.children[z];
        } else if n.children[y].can_remove_from() {
            rotate_right(n, z);
            n = &mut n.children[z];
        } else {
            merge(n, y);
            n = &mut n.children[y];
        }
    }
}

/// Replaces `n.vals[i]` with an extreme value pulled from a neighboring
/// child, when at least one of the two has slack to spare.
fn replace_value<T>(n: &mut Node<T>, i: usize) -> Option<T> {
    let lhs_can = n.children[i].can_remove_from();
    let rhs_can = n.children[i + 1].can_remove_from();
    if !lhs_can && !rhs_can {
        return None;
    }

    let lhs_len = n.children[i].vals.len();
    let rhs_len = n.children[i + 1].vals.len();
    let take_from_lhs = match lhs_len.cmp(&rhs_len) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => i % 2 == 1,
    };

    let replacement = if take_from_lhs {
        remove_max(&mut n.children[i])
    } else {
        remove_min(&mut n.children[i + 1])
    };
    Some(std::mem::replace(&mut n.vals[i], replacement))
}

/// Rebalances so that descending into child `i` of `n` is safe to remove
/// from, returning the (possibly shifted) index to descend into.
fn fatten_child<T>(n: &mut Node<T>, i: usize) -> usize {
    if i > 0 && n.children[i - 1].can_remove_from() {
        rotate_right(n, i);
        return i;
    }
    if i < n.vals.len() && n.children[i + 1].can_remove_from() {
        rotate_left(n, i);
        return i;
    }
    if i == n.vals.len() {
        merge(n, i - 1);
        i - 1
    } else {
        merge(n, i);
        i
    }
}

/// A position in a [`BTree`], or the end sentinel — a fixed-depth stack of
/// `(node, index)` frames held as two parallel arrays.
/// Like [`crate::avl::Cursor`] this carries no lifetime: it is invalidated
/// by any subsequent mutation of the host tree.
pub struct Cursor<T> {
    nodes: [Option<NonNull<Node<T>>>; MAX_HEIGHT],
    indexes: [u16; MAX_HEIGHT],
    level: usize,
}

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Cursor<T> {}

impl<T> Cursor<T> {
    fn end() -> Self {
        Cursor {
            nodes: [None; MAX_HEIGHT],
            indexes: [0; MAX_HEIGHT],
            level: 0,
        }
    }

    fn set_frame(&mut self, n: NonNull<Node<T>>, i: usize) {
        self.nodes[self.level] = Some(n);
        self.indexes[self.level] = i as u16;
    }

    fn push(&mut self, n: NonNull<Node<T>>, i: usize) {
        self.level += 1;
        self.set_frame(n, i);
    }

    fn pop(&mut self) {
        self.nodes[self.level] = None;
        self.indexes[self.level] = 0;
        self.level -= 1;
    }

    /// Whether this cursor is the end sentinel.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.nodes[0].is_none()
    }
}

impl<T> PartialEq for Cursor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.level == other.level
            && self.nodes[0] == other.nodes[0]
            && (self.nodes[0].is_none() || self.indexes[..=self.level] == other.indexes[..=self.level])
    }
}

/// The outcome of [`BTree::insert`] when it succeeds at the status level.
pub enum Insert<T> {
    /// The element was inserted at this position.
    Inserted(Cursor<T>),
    /// An equal element already exists at this position; nothing changed.
    Exists(Cursor<T>),
}

/// An ordered set of `T` built from fixed-fan-out pages, with a
/// fixed-depth stack iterator and a wildcard-capable `lower_bound`.
pub struct BTree<T, Cmp>
where
    Cmp: Fn(&T, &T) -> Ordering,
{
    root: Box<Node<T>>,
    size: usize,
    cmp: Cmp,
    destroy: Option<Box<dyn FnMut(T)>>,
}

impl<T, Cmp> BTree<T, Cmp>
where
    Cmp: Fn(&T, &T) -> Ordering,
{
    /// Creates a new, empty tree.
    pub fn new(cmp: Cmp) -> Self {
        Self {
            root: Box::new(Node::leaf()),
            size: 0,
            cmp,
            destroy: None,
        }
    }

    /// Registers a destroy callback, invoked once per element removed by
    /// [`BTree::remove`] or [`BTree::clear`] (and at `Drop`).
    pub fn set_destroy(&mut self, destroy: impl FnMut(T) + 'static) {
        self.destroy = Some(Box::new(destroy));
    }

    /// The number of elements currently stored.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the tree holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    fn grow_up(&mut self) {
        let old_root = std::mem::replace(&mut self.root, Box::new(Node::inode()));
        self.root.children.push(old_root);
        split_child(&mut self.root, 0);
    }

    /// Inserts `value`. Returns `Insert::Exists` (with a cursor at the
    /// existing element) without altering the tree when an equal element
    /// is already present.
    pub fn insert(&mut self, value: T) -> Insert<T> {
        if self.root.is_full() {
            self.grow_up();
        }

        let mut node: &mut Node<T> = &mut self.root;
        loop {
            let (i, equal) = find_value(&node.vals, &value, &self.cmp);
            if equal {
                let ptr = NonNull::from(&*node);
                let mut c = Cursor::end();
                c.set_frame(ptr, i);
                return Insert::Exists(c);
            }

            if node.is_leaf {
                node.vals.insert(i, value);
                self.size += 1;
                let ptr = NonNull::from(&*node);
                let mut c = Cursor::end();
                c.set_frame(ptr, i);
                return Insert::Inserted(c);
            }

            if node.children[i].is_full() {
                split_child(node, i);
                match (self.cmp)(&node.vals[i], &value) {
                    Ordering::Less => {
                        node = &mut node.children[i + 1];
                        continue;
                    }
                    Ordering::Equal => {
                        let ptr = NonNull::from(&*node);
                        let mut c = Cursor::end();
                        c.set_frame(ptr, i);
                        return Insert::Exists(c);
                    }
                    Ordering::Greater => {}
                }
            }
            node = &mut node.children[i];
        }
    }

    /// Removes the element matching `key`, if any, returning it alongside
    /// a cursor at the element that now immediately follows it (or the end
    /// cursor, if the removed element was the last).
    ///
    /// # Errors
    /// Returns `Status::NotFound` if no element matches `key`; the tree is
    /// left unchanged (there is then no next-iterator to report).
    pub fn remove<K>(
        &mut self,
        key: &K,
        cmp: impl Fn(&K, &T) -> Ordering,
    ) -> Result<(T, Cursor<T>), Status> {
        if !self.root.is_leaf
            && self.root.vals.len() == 1
            && !self.root.children[0].can_remove_from()
            && !self.root.children[1].can_remove_from()
        {
            merge(&mut self.root, 0);
            if self.root.vals.is_empty() {
                let new_root = self.root.children.remove(0);
                self.root = new_root;
            }
        }

        let removed = {
            let mut node: &mut Node<T> = &mut self.root;
            loop {
                let (i, equal) = find_value(&node.vals, key, &cmp);

                if node.is_leaf {
                    if !equal {
                        return Err(Status::NotFound);
                    }
                    let removed = node.vals.remove(i);
                    self.size -= 1;
                    break removed;
                }

                if equal {
                    if let Some(replaced) = replace_value(node, i) {
                        self.size -= 1;
                        break replaced;
                    }
                    merge(node, i);
                    node = &mut node.children[i];
                    continue;
                }

                let target = if node.children[i].can_remove_from() {
                    i
                } else {
                    fatten_child(node, i)
                };
                node = &mut node.children[target];
            }
        };

        let next = self.successor_cursor(key, &cmp);
        Ok((removed, next))
    }

    /// Returns a cursor at the least element greater than `key` (the
    /// "next" iterator [`BTree::remove`] reports), or the end cursor if
    /// none exists. Unlike [`BTree::lower_bound`], this assumes `cmp` is a
    /// strict total order with no element currently equal to `key` — as is
    /// always true right after `remove` — so it never needs `lower_bound`'s
    /// wildcard equal-run handling, only the plain "no match in this
    /// subtree: the answer is the nearest ancestor value we passed on the
    /// way down" backtrack.
    fn successor_cursor<K>(&self, key: &K, cmp: &impl Fn(&K, &T) -> Ordering) -> Cursor<T> {
        let mut c = Cursor::end();
        let mut candidate: Option<usize> = None;
        let mut node: &Node<T> = &self.root;

        loop {
            let (i, _equal) = find_value(&node.vals, key, cmp);
            c.set_frame(NonNull::from(node), i);
            if i < node.vals.len() {
                candidate = Some(c.level);
            }
            if node.is_leaf {
                break;
            }
            c.level += 1;
            node = &node.children[i];
        }

        if c.indexes[c.level] as usize == node.vals.len() {
            match candidate {
                Some(level) => c.level = level,
                None => return Cursor::end(),
            }
        }

        c
    }

    /// Removes every element, invoking the destroy callback (if any) on
    /// each one.
    pub fn clear(&mut self) {
        fn collect<T>(node: Box<Node<T>>, out: &mut Vec<T>) {
            let Node { vals, children, .. } = *node;
            for child in children {
                collect(child, out);
            }
            out.extend(vals);
        }
        let old_root = std::mem::replace(&mut self.root, Box::new(Node::leaf()));
        let mut drained = Vec::new();
        collect(old_root, &mut drained);
        self.size = 0;
        if let Some(destroy) = self.destroy.as_mut() {
            for v in drained {
                destroy(v);
            }
        }
    }

    /// Returns a cursor at an element equal to `key`, or the end cursor.
    pub fn find<K>(&self, key: &K, cmp: impl Fn(&K, &T) -> Ordering) -> Cursor<T> {
        let mut node: &Node<T> = &self.root;
        let mut c = Cursor::end();
        loop {
            let (i, equal) = find_value(&node.vals, key, &cmp);
            if node.is_leaf {
                if equal {
                    c.set_frame(NonNull::from(node), i);
                    return c;
                }
                return Cursor::end();
            }
            c.set_frame(NonNull::from(node), i);
            if equal {
                return c;
            }
            c.level += 1;
            node = &node.children[i];
        }
    }

    /// Returns a cursor at the first element not less than `key`, under a
    /// possibly weak/"wildcard" `cmp` ordering — the element
    /// found need not be unique, only the leftmost of any matching run.
    pub fn lower_bound<K>(&self, key: &K, cmp: impl Fn(&K, &T) -> Ordering) -> Cursor<T> {
        let mut c = Cursor::end();
        let mut found_level: Option<usize> = None;
        let mut node: &Node<T> = &self.root;

        loop {
            let (i, equal) = find_pattern(&node.vals, key, &cmp);
            c.set_frame(NonNull::from(node), i);
            if equal {
                found_level = Some(c.level);
            }
            if node.is_leaf {
                break;
            }
            c.level += 1;
            node = &node.children[i];
        }

        if c.indexes[c.level] as usize == node.vals.len() {
            if let Some(level) = found_level {
                c.level = level;
            } else {
                return Cursor::end();
            }
        }

        c
    }

    /// Dereferences a cursor, or `None` for the end sentinel.
    #[must_use]
    pub fn get(&self, cursor: Cursor<T>) -> Option<&T> {
        let node = cursor.nodes[cursor.level]?;
        let i = cursor.indexes[cursor.level] as usize;
        unsafe { node.as_ref().vals.get(i) }
    }

    /// The first (least) element, or the end cursor if empty.
    #[must_use]
    pub fn begin(&self) -> Cursor<T> {
        if self.size == 0 {
            return Cursor::end();
        }
        let mut c = Cursor::end();
        let mut node: &Node<T> = &self.root;
        c.set_frame(NonNull::from(node), 0);
        while !node.is_leaf {
            node = &node.children[0];
            c.push(NonNull::from(node), 0);
        }
        c
    }

    /// The end sentinel.
    #[must_use]
    pub fn end(&self) -> Cursor<T> {
        Cursor::end()
    }

    /// Advances `cursor` to the next element in order.
    #[must_use]
    pub fn next(&self, cursor: Cursor<T>) -> Cursor<T> {
        let mut c = cursor;
        if c.is_end() {
            return c;
        }

        unsafe {
            c.indexes[c.level] += 1;
            let mut node = c.nodes[c.level].unwrap();

            if node.as_ref().is_leaf {
                while (c.indexes[c.level] as usize) >= node.as_ref().vals.len() {
                    if c.level == 0 {
                        c.nodes[0] = None;
                        return c;
                    }
                    c.pop();
                    node = c.nodes[c.level].unwrap();
                }
            } else {
                let idx = c.indexes[c.level] as usize;
                let mut child = NonNull::from(node.as_ref().children[idx].as_ref());
                c.push(child, 0);
                while !child.as_ref().is_leaf {
                    child = NonNull::from(child.as_ref().children[0].as_ref());
                    c.push(child, 0);
                }
            }
        }

        c
    }
}

impl<T, Cmp> Drop for BTree<T, Cmp>
where
    Cmp: Fn(&T, &T) -> Ordering,
{
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_tree() -> BTree<i32, impl Fn(&i32, &i32) -> Ordering> {
        BTree::new(|a: &i32, b: &i32| a.cmp(b))
    }

    fn in_order(tree: &BTree<i32, impl Fn(&i32, &i32) -> Ordering>) -> Vec<i32> {
        let mut out = Vec::new();
        let mut c = tree.begin();
        while !c.is_end() {
            out.push(*tree.get(c).unwrap());
            c = tree.next(c);
        }
        out
    }

    #[test]
    fn empty_tree() {
        let tree = int_tree();
        assert_eq!(tree.size(), 0);
        assert!(tree.begin().is_end());
    }

    #[test]
    fn insert_find_round_trip() {
        let mut tree = int_tree();
        for v in [5, 3, 8, 1, 4, 7, 9] {
            assert!(matches!(tree.insert(v), Insert::Inserted(_)));
        }
        assert_eq!(tree.size(), 7);
        assert_eq!(in_order(&tree), vec![1, 3, 4, 5, 7, 8, 9]);
        assert!(!tree.find(&7, |k, v| k.cmp(v)).is_end());
        assert!(tree.find(&42, |k, v| k.cmp(v)).is_end());
    }

    #[test]
    fn duplicate_rejection() {
        let mut tree = int_tree();
        tree.insert(1);
        assert!(matches!(tree.insert(1), Insert::Exists(_)));
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn many_inserts_trigger_splits_and_stay_sorted() {
        let mut tree = int_tree();
        let n = 5000;
        for v in 0..n {
            tree.insert(v);
        }
        assert_eq!(tree.size(), n as usize);
        assert_eq!(in_order(&tree), (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn remove_everything_in_random_order() {
        let mut tree = int_tree();
        for v in 0..500 {
            tree.insert(v);
        }
        // Remove every other element, forcing merges/rotations.
        for v in (0..500).step_by(2) {
            let (removed, _) = tree.remove(&v, |k, x: &i32| k.cmp(x)).unwrap();
            assert_eq!(removed, v);
        }
        assert_eq!(tree.size(), 250);
        assert_eq!(in_order(&tree), (1..500).step_by(2).collect::<Vec<_>>());

        for v in (1..500).step_by(2) {
            let (removed, _) = tree.remove(&v, |k, x: &i32| k.cmp(x)).unwrap();
            assert_eq!(removed, v);
        }
        assert_eq!(tree.size(), 0);
        assert!(tree.begin().is_end());
    }

    #[test]
    fn remove_reports_the_successor_as_next_iterator() {
        let mut tree = int_tree();
        for v in 1..100 {
            tree.insert(v);
        }
        let (removed, next) = tree.remove(&50, |k, x: &i32| k.cmp(x)).unwrap();
        assert_eq!(removed, 50);
        assert_eq!(*tree.get(next).unwrap(), 51);
    }

    #[test]
    fn remove_of_the_last_element_reports_end_as_next_iterator() {
        let mut tree = int_tree();
        for v in 1..100 {
            tree.insert(v);
        }
        let (removed, next) = tree.remove(&99, |k, x: &i32| k.cmp(x)).unwrap();
        assert_eq!(removed, 99);
        assert!(next.is_end());
    }

    #[test]
    fn remove_missing_is_not_found() {
        let mut tree = int_tree();
        tree.insert(1);
        assert!(matches!(
            tree.remove(&99, |k, x: &i32| k.cmp(x)),
            Err(Status::NotFound)
        ));
    }

    #[test]
    fn lower_bound_wildcard_matches_a_range() {
        let mut tree = int_tree();
        for v in [10, 20, 20, 30, 40] {
            tree.insert(v);
        }
        // A key that matches any value >= 20 and < 30, simulating a
        // "wildcard" comparator that isn't a strict total order.
        let cursor = tree.lower_bound(&25, |key: &i32, v: &i32| {
            if *v < 20 {
                Ordering::Less
            } else if *v >= 30 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });
        assert_eq!(*tree.get(cursor).unwrap(), 20);
    }

    #[test]
    fn lower_bound_past_everything_is_end() {
        let mut tree = int_tree();
        for v in [1, 2, 3] {
            tree.insert(v);
        }
        let cursor = tree.lower_bound(&100, |k: &i32, v: &i32| k.cmp(v));
        assert!(cursor.is_end());
    }

    #[test]
    fn clear_empties_tree_and_runs_destroy() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let destroyed = Rc::new(RefCell::new(Vec::new()));
        let destroyed_clone = destroyed.clone();
        let mut tree = BTree::new(|a: &i32, b: &i32| a.cmp(b));
        tree.set_destroy(move |v| destroyed_clone.borrow_mut().push(v));

        for v in 0..20 {
            tree.insert(v);
        }
        tree.clear();
        assert_eq!(tree.size(), 0);
        let mut got = destroyed.borrow().clone();
        got.sort_unstable();
        assert_eq!(got, (0..20).collect::<Vec<_>>());
    }
}
