//! An ordered set/multiset with bidirectional iteration.
//!
//! Nodes form a raw-pointer parent/left/right graph — the natural
//! systems-language analogue of a C-style node-pointer tree — owned
//! exclusively by the tree and freed on `remove` or `Drop`.

use crate::alloc::AllocatorHandle;
use crate::status::Status;
use std::alloc::Layout;
use std::cmp::Ordering;
use std::ptr::NonNull;

struct Node<T> {
    data: T,
    left: Option<NonNull<Node<T>>>,
    right: Option<NonNull<Node<T>>>,
    parent: Option<NonNull<Node<T>>>,
    /// Height of right subtree minus height of left subtree. Transiently
    /// ±2 during rebalancing; always in {-1, 0, 1} once a public operation
    /// returns.
    balance: i8,
}

/// A position in an [`AvlTree`], or the end sentinel.
///
/// This is a bare handle with no borrow tied to the tree: it is
/// invalidated by any mutation of the host tree. Dereferencing it through
/// [`AvlTree::get`] after such a mutation is
/// logic-errorful but not memory-unsafe, since the tree never frees a node
/// without first nulling out the pointers that referenced it from
/// reachable structure — callers simply get stale or panicking behavior if
/// they ignore the invalidation rule, never undefined behavior, because
/// `get` always goes through the owning tree's own pointers.
pub struct Cursor<T>(Option<NonNull<Node<T>>>);

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Cursor<T> {}

impl<T> Cursor<T> {
    const END: Self = Cursor(None);

    /// Whether this cursor is the end (or rend) sentinel.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.0.is_none()
    }
}

/// The outcome of [`AvlTree::insert`] when it succeeds at the status
/// level — either a brand new element was inserted, or an equal element
/// already existed (only reachable when duplicates are disallowed).
pub enum Insert<T> {
    /// The element was inserted at this position.
    Inserted(Cursor<T>),
    /// An equal element already exists at this position; nothing changed.
    Exists(Cursor<T>),
}

/// An ordered set (or multiset) of `T`, comparator-driven, with
/// bidirectional iteration.
pub struct AvlTree<T, Cmp>
where
    Cmp: Fn(&T, &T) -> Ordering,
{
    root: Option<NonNull<Node<T>>>,
    size: usize,
    allow_duplicates: bool,
    cmp: Cmp,
    destroy: Option<Box<dyn FnMut(T)>>,
    allocator: AllocatorHandle,
}

fn node_layout<T>() -> Layout {
    Layout::new::<Node<T>>()
}

impl<T, Cmp> AvlTree<T, Cmp>
where
    Cmp: Fn(&T, &T) -> Ordering,
{
    /// Creates a new, empty tree using the system allocator.
    pub fn new(allow_duplicates: bool, cmp: Cmp) -> Self {
        Self::with_allocator(allow_duplicates, cmp, AllocatorHandle::default())
    }

    /// Creates a new, empty tree using the given allocator.
    pub fn with_allocator(allow_duplicates: bool, cmp: Cmp, allocator: AllocatorHandle) -> Self {
        Self {
            root: None,
            size: 0,
            allow_duplicates,
            cmp,
            destroy: None,
            allocator,
        }
    }

    /// Registers a destroy callback, invoked exactly once per element at
    /// teardown (`remove` or `Drop`).
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

    fn alloc_node(&self, data: T) -> Result<NonNull<Node<T>>, Status> {
        let Some(ptr) = self.allocator.alloc(node_layout::<T>()) else {
            return Err(Status::OutOfMemory);
        };
        let node_ptr = ptr.cast::<Node<T>>();
        unsafe {
            node_ptr.as_ptr().write(Node {
                data,
                left: None,
                right: None,
                parent: None,
                balance: 0,
            });
        }
        Ok(node_ptr)
    }

    /// Frees a node's storage (does not run destroy; caller already
    /// extracted or destroyed `data`).
    unsafe fn dealloc_node(&self, node: NonNull<Node<T>>) {
        unsafe {
            self.allocator
                .dealloc(node.cast::<u8>(), node_layout::<T>());
        }
    }

    fn destroy_payload(&mut self, data: T) {
        if let Some(destroy) = self.destroy.as_mut() {
            destroy(data);
        }
    }

    // -- rotations, translated directly from tree.c -------------------

    /// Splices `q` (a child of `p`) up to replace `p`.
    unsafe fn splice(&mut self, mut p: NonNull<Node<T>>, mut q: NonNull<Node<T>>) {
        unsafe {
            debug_assert_eq!(q.as_ref().parent, Some(p));
            let p_parent = p.as_ref().parent;
            q.as_mut().parent = p_parent;
            if let Some(mut gp) = p_parent {
                if gp.as_ref().left == Some(p) {
                    gp.as_mut().left = Some(q);
                } else {
                    gp.as_mut().right = Some(q);
                }
            }

            if p.as_ref().right == Some(q) {
                // Rotate left
                let q_left = q.as_ref().left;
                p.as_mut().right = q_left;
                q.as_mut().left = Some(p);
                if let Some(mut r) = q_left {
                    r.as_mut().parent = Some(p);
                }
            } else {
                debug_assert_eq!(p.as_ref().left, Some(q));
                let q_right = q.as_ref().right;
                p.as_mut().left = q_right;
                q.as_mut().right = Some(p);
                if let Some(mut r) = q_right {
                    r.as_mut().parent = Some(p);
                }
            }

            p.as_mut().parent = Some(q);
        }
    }

    /// `rotate_left`: p has balance 2, right child q has balance 0 or 1.
    unsafe fn rotate_left(&mut self, p: NonNull<Node<T>>) -> (NonNull<Node<T>>, i32) {
        unsafe {
            let mut q = p.as_ref().right.unwrap();
            let height_change = if q.as_ref().balance == 0 { 0 } else { -1 };

            self.splice(p, q);

            q.as_mut().balance -= 1;
            let mut p = p;
            p.as_mut().balance = -q.as_ref().balance;
            (q, height_change)
        }
    }

    /// `rotate_right`: p has balance -2, left child q has balance 0 or -1.
    unsafe fn rotate_right(&mut self, p: NonNull<Node<T>>) -> (NonNull<Node<T>>, i32) {
        unsafe {
            let mut q = p.as_ref().left.unwrap();
            let height_change = if q.as_ref().balance == 0 { 0 } else { -1 };

            self.splice(p, q);

            q.as_mut().balance += 1;
            let mut p = p;
            p.as_mut().balance = -q.as_ref().balance;
            (q, height_change)
        }
    }

    /// `rotate_left_right`: p has balance -2, left child q has balance 1.
    unsafe fn rotate_left_right(&mut self, p: NonNull<Node<T>>) -> (NonNull<Node<T>>, i32) {
        unsafe {
            let mut q = p.as_ref().left.unwrap();
            let mut r = q.as_ref().right.unwrap();

            self.splice(q, r);
            self.splice(p, r);

            let r_bal = r.as_ref().balance as i32;
            q.as_mut().balance -= (1 + r_bal.max(0)) as i8;
            let mut p = p;
            let q_bal = q.as_ref().balance as i32;
            p.as_mut().balance += (1 - (r_bal.min(0) - 1).min(r_bal + q_bal)) as i8;
            r.as_mut().balance = 0;

            (r, -1)
        }
    }

    /// `rotate_right_left`: p has balance 2, right child q has balance -1.
    unsafe fn rotate_right_left(&mut self, p: NonNull<Node<T>>) -> (NonNull<Node<T>>, i32) {
        unsafe {
            let mut q = p.as_ref().right.unwrap();
            let mut r = q.as_ref().left.unwrap();

            self.splice(q, r);
            self.splice(p, r);

            let r_bal = r.as_ref().balance as i32;
            q.as_mut().balance += (1 - r_bal.min(0)) as i8;
            let mut p = p;
            let q_bal = q.as_ref().balance as i32;
            p.as_mut().balance -= (1 + (r_bal.max(0) + 1).max(r_bal + q_bal)) as i8;
            r.as_mut().balance = 0;

            (r, -1)
        }
    }

    /// Rebalances `node` (balance ±2) and fixes up `self.root` if `node`
    /// was the root.
    unsafe fn rebalance(
        &mut self,
        node: NonNull<Node<T>>,
    ) -> (NonNull<Node<T>>, i32) {
        unsafe {
            let is_root = node.as_ref().parent.is_none();
            debug_assert!((is_root && self.root == Some(node)) || (!is_root && self.root != Some(node)));

            let (replacement, height_change) = match node.as_ref().balance {
                -2 => {
                    let left = node.as_ref().left.unwrap();
                    if left.as_ref().balance == 1 {
                        self.rotate_left_right(node)
                    } else {
                        self.rotate_right(node)
                    }
                }
                2 => {
                    let right = node.as_ref().right.unwrap();
                    if right.as_ref().balance == -1 {
                        self.rotate_right_left(node)
                    } else {
                        self.rotate_left(node)
                    }
                }
                _ => (node, 0),
            };

            if is_root {
                debug_assert!(replacement.as_ref().parent.is_none());
                self.root = Some(replacement);
            }

            (replacement, height_change)
        }
    }

    /// Inserts `value`. Returns `Insert::Exists` (with a cursor at the
    /// existing element) without altering the tree when duplicates are
    /// disallowed and an equal element is already present.
    ///
    /// # Errors
    /// Returns `Status::OutOfMemory` if node allocation fails; the tree is
    /// left unchanged.
    pub fn insert(&mut self, value: T) -> Result<Insert<T>, Status> {
        let mut parent: Option<NonNull<Node<T>>> = None;
        let mut cmp = Ordering::Equal;

        unsafe {
            let mut cur = self.root;
            while let Some(n) = cur {
                parent = Some(n);
                cmp = (self.cmp)(&value, &n.as_ref().data);
                match cmp {
                    Ordering::Less => cur = n.as_ref().left,
                    Ordering::Greater => cur = n.as_ref().right,
                    Ordering::Equal if self.allow_duplicates => cur = n.as_ref().right,
                    Ordering::Equal => return Ok(Insert::Exists(Cursor(Some(n)))),
                }
            }
        }

        let node = self.alloc_node(value)?;

        unsafe {
            let mut p_height_increased = false;
            node.cast::<Node<T>>().as_ptr().as_mut().unwrap().parent = parent;

            match parent {
                None => self.root = Some(node),
                Some(mut p) => {
                    if cmp == Ordering::Less {
                        debug_assert!(p.as_ref().left.is_none());
                        p.as_mut().left = Some(node);
                        p.as_mut().balance -= 1;
                        p_height_increased = p.as_ref().right.is_none();
                    } else {
                        debug_assert!(p.as_ref().right.is_none());
                        p.as_mut().right = Some(node);
                        p.as_mut().balance += 1;
                        p_height_increased = p.as_ref().left.is_none();
                    }
                }
            }

            if let Some(p) = parent {
                if p_height_increased {
                    let mut i = p;
                    while let Some(mut ip) = i.as_ref().parent {
                        ip.as_mut().balance += if ip.as_ref().left == Some(i) { -1 } else { 1 };

                        if ip.as_ref().balance == -2 || ip.as_ref().balance == 2 {
                            self.rebalance(ip);
                            break;
                        }
                        if ip.as_ref().balance == 0 {
                            break;
                        }
                        i = ip;
                    }
                }
            }
        }

        self.size += 1;
        Ok(Insert::Inserted(Cursor(Some(node))))
    }

    /// Removes the element at `cursor`.
    ///
    /// # Panics
    /// Panics if `cursor` is the end sentinel.
    pub fn remove(&mut self, cursor: Cursor<T>) -> Status {
        let Some(n) = cursor.0 else {
            return Status::BadArgument;
        };

        unsafe {
            // Leaf root: trivial case.
            if self.root == Some(n) && n.as_ref().left.is_none() && n.as_ref().right.is_none() {
                self.root = None;
                let data = std::ptr::read(&n.as_ref().data);
                self.dealloc_node(n);
                self.destroy_payload(data);
                self.size -= 1;
                return Status::Success;
            }

            let mut pp: Option<(NonNull<Node<T>>, bool)> = None; // (parent, is_left_child)
            let mut d_balance: i32 = 0;
            let mut to_balance = n.as_ref().parent;

            if let Some(mut parent) = n.as_ref().parent {
                if parent.as_ref().left == Some(n) {
                    pp = Some((parent, true));
                    d_balance = 1;
                } else {
                    debug_assert_eq!(parent.as_ref().right, Some(n));
                    pp = Some((parent, false));
                    d_balance = -1;
                }
                let _ = &mut parent;
            }

            let mut height_change: i32;

            if n.as_ref().left.is_none() && n.as_ref().right.is_none() {
                if let Some((mut parent, is_left)) = pp {
                    if is_left {
                        parent.as_mut().left = None;
                    } else {
                        parent.as_mut().right = None;
                    }
                    to_balance = Some(parent);
                    height_change = if parent.as_ref().left.is_none() && parent.as_ref().right.is_none() {
                        -1
                    } else {
                        0
                    };
                } else {
                    height_change = 0;
                }
            } else if n.as_ref().left.is_none() {
                let mut right = n.as_ref().right.unwrap();
                if let Some((mut parent, is_left)) = pp {
                    if is_left {
                        parent.as_mut().left = Some(right);
                    } else {
                        parent.as_mut().right = Some(right);
                    }
                    to_balance = Some(parent);
                } else {
                    self.root = Some(right);
                }
                right.as_mut().parent = n.as_ref().parent;
                height_change = -1;
            } else if n.as_ref().right.is_none() {
                let mut left = n.as_ref().left.unwrap();
                if let Some((mut parent, is_left)) = pp {
                    if is_left {
                        parent.as_mut().left = Some(left);
                    } else {
                        parent.as_mut().right = Some(left);
                    }
                    to_balance = Some(parent);
                } else {
                    self.root = Some(left);
                }
                left.as_mut().parent = n.as_ref().parent;
                height_change = -1;
            } else {
                // Two children: splice in the in-order successor.
                let mut replace = n.as_ref().right.unwrap();
                while let Some(l) = replace.as_ref().left {
                    replace = l;
                }

                let mut replace_parent = replace.as_ref().parent.unwrap();
                if replace_parent.as_ref().left == Some(replace) {
                    height_change = if replace_parent.as_ref().right.is_some() { 0 } else { -1 };
                    d_balance = 1;
                    to_balance = Some(replace_parent);
                    replace_parent.as_mut().left = replace.as_ref().right;
                } else {
                    debug_assert_eq!(replace_parent, n);
                    height_change = if replace_parent.as_ref().left.is_some() { 0 } else { -1 };
                    d_balance = -1;
                    to_balance = Some(replace_parent);
                    replace_parent.as_mut().right = replace.as_ref().right;
                }

                if to_balance == Some(n) {
                    to_balance = Some(replace);
                }

                if let Some(mut rr) = replace.as_ref().right {
                    rr.as_mut().parent = replace.as_ref().parent;
                }

                replace.as_mut().balance = n.as_ref().balance;

                if let Some((mut parent, is_left)) = pp {
                    if is_left {
                        parent.as_mut().left = Some(replace);
                    } else {
                        parent.as_mut().right = Some(replace);
                    }
                } else {
                    debug_assert_eq!(self.root, Some(n));
                    self.root = Some(replace);
                }

                replace.as_mut().parent = n.as_ref().parent;
                replace.as_mut().left = n.as_ref().left;
                n.as_ref().left.unwrap().as_ptr().as_mut().unwrap().parent = Some(replace);
                replace.as_mut().right = n.as_ref().right;
                if let Some(mut right) = n.as_ref().right {
                    if right != replace {
                        right.as_mut().parent = Some(replace);
                    }
                }
            }

            // Rebalance upward from to_balance.
            let mut i_opt = to_balance;
            while let Some(mut i) = i_opt {
                i.as_mut().balance += d_balance as i8;
                if d_balance == 0 || i.as_ref().balance == -1 || i.as_ref().balance == 1 {
                    break;
                }

                debug_assert_ne!(i, n);
                let (new_i, hc) = self.rebalance(i);
                i = new_i;
                height_change = if i.as_ref().balance == 0 { -1 } else { hc };

                if let Some(ip) = i.as_ref().parent {
                    d_balance = if ip.as_ref().left == Some(i) {
                        -height_change
                    } else {
                        height_change
                    };
                    i_opt = Some(ip);
                } else {
                    i_opt = None;
                }
            }

            let data = std::ptr::read(&n.as_ref().data);
            self.dealloc_node(n);
            self.destroy_payload(data);
            self.size -= 1;
        }

        Status::Success
    }

    /// Returns a cursor at the first element equal to `key`, or the end
    /// cursor if none exists.
    pub fn find<K>(&self, key: &K, cmp: impl Fn(&K, &T) -> Ordering) -> Cursor<T> {
        unsafe {
            let mut n = self.root;
            while let Some(node) = n {
                match cmp(key, &node.as_ref().data) {
                    Ordering::Equal => return Cursor(Some(node)),
                    Ordering::Less => n = node.as_ref().left,
                    Ordering::Greater => n = node.as_ref().right,
                }
            }
        }
        Cursor::END
    }

    /// Dereferences a cursor, or `None` for the end sentinel.
    #[must_use]
    pub fn get(&self, cursor: Cursor<T>) -> Option<&T> {
        unsafe { cursor.0.map(|n| &n.as_ref().data) }
    }

    /// The leftmost (least) element, or the end cursor if empty.
    #[must_use]
    pub fn begin(&self) -> Cursor<T> {
        let Some(mut n) = self.root else {
            return Cursor::END;
        };
        unsafe {
            while let Some(l) = n.as_ref().left {
                n = l;
            }
        }
        Cursor(Some(n))
    }

    /// The end sentinel.
    #[must_use]
    pub fn end(&self) -> Cursor<T> {
        Cursor::END
    }

    /// The rightmost (greatest) element, or the rend cursor if empty.
    #[must_use]
    pub fn rbegin(&self) -> Cursor<T> {
        let Some(mut n) = self.root else {
            return Cursor::END;
        };
        unsafe {
            while let Some(r) = n.as_ref().right {
                n = r;
            }
        }
        Cursor(Some(n))
    }

    /// The rend sentinel.
    #[must_use]
    pub fn rend(&self) -> Cursor<T> {
        Cursor::END
    }

    /// Advances `cursor` to the next element in order.
    #[must_use]
    pub fn next(&self, cursor: Cursor<T>) -> Cursor<T> {
        let Some(mut n) = cursor.0 else {
            return Cursor::END;
        };
        unsafe {
            if let Some(mut r) = n.as_ref().right {
                while let Some(l) = r.as_ref().left {
                    r = l;
                }
                n = r;
            } else {
                while let Some(p) = n.as_ref().parent {
                    if p.as_ref().right == Some(n) {
                        n = p;
                    } else {
                        break;
                    }
                }
                return match n.as_ref().parent {
                    Some(p) => Cursor(Some(p)),
                    None => Cursor::END,
                };
            }
        }
        Cursor(Some(n))
    }

    /// Retreats `cursor` to the previous element in order.
    #[must_use]
    pub fn prev(&self, cursor: Cursor<T>) -> Cursor<T> {
        let Some(mut n) = cursor.0 else {
            return Cursor::END;
        };
        unsafe {
            if let Some(mut l) = n.as_ref().left {
                while let Some(r) = l.as_ref().right {
                    l = r;
                }
                n = l;
            } else {
                while let Some(p) = n.as_ref().parent {
                    if p.as_ref().left == Some(n) {
                        n = p;
                    } else {
                        break;
                    }
                }
                return match n.as_ref().parent {
                    Some(p) => Cursor(Some(p)),
                    None => Cursor::END,
                };
            }
        }
        Cursor(Some(n))
    }

    fn free_rec(&mut self, n: Option<NonNull<Node<T>>>) {
        if let Some(node) = n {
            unsafe {
                self.free_rec(node.as_ref().left);
                self.free_rec(node.as_ref().right);
                let data = std::ptr::read(&node.as_ref().data);
                self.dealloc_node(node);
                self.destroy_payload(data);
            }
        }
    }
}

impl<T, Cmp> Drop for AvlTree<T, Cmp>
where
    Cmp: Fn(&T, &T) -> Ordering,
{
    fn drop(&mut self) {
        let root = self.root.take();
        self.free_rec(root);
    }
}

impl<T> NonNull<Node<T>> {}

// `NonNull<Node<T>>` already implements `PartialEq`/`Eq` (pointer equality).
