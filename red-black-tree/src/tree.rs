use colored::Colorize;
use node_allocator::{NodeAllocator, SENTINEL};
use std::ops::{Index, IndexMut};

use crate::error::TreeError;
use crate::node::{Color, Dir, NodeHandle, COLOR, LEFT, PARENT, RIGHT};

#[inline(always)]
fn opt(handle: NodeHandle) -> Option<NodeHandle> {
    if handle == SENTINEL {
        None
    } else {
        Some(handle)
    }
}

/// The payload an arena slot carries: the caller's key alongside the
/// caller's value. The tree compares `key` to place nodes for the
/// convenience `insert`/`remove`/`get` methods (`§4.7`); the linkage
/// primitives never look at it.
#[repr(C)]
#[derive(Default, Copy, Clone)]
pub struct RBNode<K: PartialOrd + Copy + Clone + Default, V: Copy + Clone + Default> {
    pub key: K,
    pub value: V,
}

impl<K, V> RBNode<K, V>
where
    K: PartialOrd + Copy + Clone + Default,
    V: Copy + Clone + Default,
{
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// An intrusive red-black tree backed by a fixed-capacity arena of at most
/// `MAX_SIZE` nodes. See the crate root docs for the split between the
/// linkage core (`link_node`, `insert_fixup`, `erase`, `replace`, traversal,
/// accessors) and the ordered-map convenience built on top of it.
#[derive(Copy, Clone)]
pub struct RedBlackTree<const MAX_SIZE: usize, K, V>
where
    K: PartialOrd + Copy + Clone + Default,
    V: Copy + Clone + Default,
{
    pub root: NodeHandle,
    allocator: NodeAllocator<MAX_SIZE, 4, RBNode<K, V>>,
}

impl<const MAX_SIZE: usize, K, V> Default for RedBlackTree<MAX_SIZE, K, V>
where
    K: PartialOrd + Copy + Clone + Default,
    V: Copy + Clone + Default,
{
    fn default() -> Self {
        RedBlackTree {
            root: SENTINEL,
            allocator: NodeAllocator::default(),
        }
    }
}

impl<const MAX_SIZE: usize, K, V> RedBlackTree<MAX_SIZE, K, V>
where
    K: PartialOrd + Copy + Clone + Default,
    V: Copy + Clone + Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.allocator.size as usize
    }

    pub fn is_empty(&self) -> bool {
        self.root == SENTINEL
    }

    pub(crate) fn get_node(&self, node: NodeHandle) -> &RBNode<K, V> {
        self.allocator.get(node).get_value()
    }

    pub(crate) fn get_node_mut(&mut self, node: NodeHandle) -> &mut RBNode<K, V> {
        self.allocator.get_mut(node).get_value_mut()
    }

    // --- linkage accessors (§4.1) -----------------------------------------

    #[inline(always)]
    fn get_left(&self, node: NodeHandle) -> NodeHandle {
        self.allocator.get_register(node, LEFT)
    }

    #[inline(always)]
    fn get_right(&self, node: NodeHandle) -> NodeHandle {
        self.allocator.get_register(node, RIGHT)
    }

    #[inline(always)]
    fn get_parent(&self, node: NodeHandle) -> NodeHandle {
        self.allocator.get_register(node, PARENT)
    }

    #[inline(always)]
    fn get_child(&self, node: NodeHandle, dir: Dir) -> NodeHandle {
        match dir {
            Dir::Left => self.get_left(node),
            Dir::Right => self.get_right(node),
        }
    }

    #[inline(always)]
    fn get_color_raw(&self, node: NodeHandle) -> u32 {
        self.allocator.get_register(node, COLOR)
    }

    #[inline(always)]
    fn color_red(&mut self, node: NodeHandle) {
        if node != SENTINEL {
            self.allocator.set_register(node, Color::Red.to_register(), COLOR);
        }
    }

    #[inline(always)]
    fn color_black(&mut self, node: NodeHandle) {
        self.allocator.set_register(node, Color::Black.to_register(), COLOR);
    }

    #[inline(always)]
    fn color_node(&mut self, node: NodeHandle, raw_color: u32) {
        self.allocator.set_register(node, raw_color, COLOR);
    }

    /// An absent slot is always treated as black, matching the usual
    /// red-black tree convention that nil children count toward black-height.
    #[inline(always)]
    fn is_red(&self, node: NodeHandle) -> bool {
        self.get_color_raw(node) == Color::Red.to_register()
    }

    #[inline(always)]
    fn is_black(&self, node: NodeHandle) -> bool {
        !self.is_red(node)
    }

    pub fn is_leaf(&self, node: NodeHandle) -> bool {
        self.get_left(node) == SENTINEL && self.get_right(node) == SENTINEL
    }

    /// Public linkage accessor (§6): the node's parent, or absent at the root.
    pub fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        opt(self.get_parent(node))
    }

    /// Public linkage accessor (§6).
    pub fn left_child(&self, node: NodeHandle) -> Option<NodeHandle> {
        opt(self.get_left(node))
    }

    /// Public linkage accessor (§6).
    pub fn right_child(&self, node: NodeHandle) -> Option<NodeHandle> {
        opt(self.get_right(node))
    }

    /// Public linkage accessor (§6).
    pub fn color(&self, node: NodeHandle) -> Color {
        Color::from_register(self.get_color_raw(node))
    }

    #[inline(always)]
    fn child_dir(&self, parent: NodeHandle, child: NodeHandle) -> Dir {
        if self.get_left(parent) == child {
            Dir::Left
        } else if self.get_right(parent) == child {
            Dir::Right
        } else {
            panic!("nodes are not connected")
        }
    }

    #[inline(always)]
    fn connect(&mut self, parent: NodeHandle, child: NodeHandle, dir: Dir) {
        self.allocator.connect(parent, child, dir.register(), PARENT);
    }

    /// Rotates at `x` in direction `dir`: `x`'s `dir.opposite()` child takes
    /// `x`'s place, and `x` becomes that child's `dir`-side child. `dir =
    /// Left` is the textbook "left rotation." Returns the new subtree root,
    /// or `None` if there is no child on the `dir.opposite()` side to
    /// rotate up.
    fn rotate_dir(&mut self, x: NodeHandle, dir: Dir) -> Option<NodeHandle> {
        let grandparent = self.get_parent(x);
        let y = self.get_child(x, dir.opposite());
        if y == SENTINEL {
            return None;
        }
        let inner = self.get_child(y, dir);
        self.allocator.connect(y, x, dir.register(), PARENT);
        self.allocator.connect(x, inner, dir.opposite().register(), PARENT);
        if grandparent != SENTINEL {
            let gdir = self.child_dir(grandparent, x);
            self.allocator.connect(grandparent, y, gdir.register(), PARENT);
        } else {
            self.allocator.clear_register(y, PARENT);
            self.root = y;
        }
        Some(y)
    }

    fn transplant(&mut self, target: NodeHandle, source: NodeHandle) {
        let parent = self.get_parent(target);
        if parent == SENTINEL {
            self.root = source;
            self.allocator.set_register(source, SENTINEL, PARENT);
            return;
        }
        let dir = self.child_dir(parent, target);
        self.connect(parent, source, dir);
    }

    fn find_min(&self, mut node: NodeHandle) -> NodeHandle {
        while self.get_left(node) != SENTINEL {
            node = self.get_left(node);
        }
        node
    }

    fn find_max(&self, mut node: NodeHandle) -> NodeHandle {
        while self.get_right(node) != SENTINEL {
            node = self.get_right(node);
        }
        node
    }

    // --- insertion (§4.2) ---------------------------------------------------

    /// Attaches detached node `node` as a red leaf under `parent` on side
    /// `side`, or installs it as the (still-red, not yet fixed up) root if
    /// `parent` is absent. The caller must follow this with `insert_fixup`.
    pub fn link_node(&mut self, node: NodeHandle, parent: Option<NodeHandle>, side: Dir) {
        self.allocator.clear_register(node, LEFT);
        self.allocator.clear_register(node, RIGHT);
        self.allocator.clear_register(node, PARENT);
        self.color_red(node);
        match parent {
            None => self.root = node,
            Some(p) => self.connect(p, node, side),
        }
    }

    /// Restores invariants 1-3 after `link_node` attached a fresh red leaf.
    pub fn insert_fixup(&mut self, mut node: NodeHandle) {
        while self.is_red(self.get_parent(node)) {
            let mut parent = self.get_parent(node);
            let mut grandparent = self.get_parent(parent);
            if grandparent == SENTINEL {
                // parent is the root; a red root is fixed up below.
                break;
            }
            let dir = self.child_dir(grandparent, parent);
            let uncle = self.get_child(grandparent, dir.opposite());

            if self.is_red(uncle) {
                // Case 1: recolor and move the problem up to the grandparent.
                self.color_black(uncle);
                self.color_black(parent);
                self.color_red(grandparent);
                node = grandparent;
            } else {
                if self.child_dir(parent, node) == dir.opposite() {
                    // Case 2: rotate at the parent to make `node` the
                    // outside grandchild, then fall through to case 3.
                    self.rotate_dir(parent, dir);
                    node = parent;
                }
                // Case 3.
                parent = self.get_parent(node);
                grandparent = self.get_parent(parent);
                self.color_black(parent);
                self.color_red(grandparent);
                self.rotate_dir(grandparent, dir.opposite());
            }
        }
        self.color_black(self.root);
    }

    // --- erasure (§4.3) ------------------------------------------------------

    /// Unlinks `node` from the tree, rebalances, and returns its payload.
    /// `node` must currently be in the tree.
    pub fn erase(&mut self, node: NodeHandle) -> RBNode<K, V> {
        let left = self.get_left(node);
        let right = self.get_right(node);
        let mut deficient_black = self.is_black(node);

        let (pivot, parent_dir) = if left == SENTINEL {
            // When `right` is also absent, `node` is a leaf: the deficient
            // slot left behind is SENTINEL itself, which has no registers of
            // its own to read a parent back out of, so capture `(parent,
            // side)` here before `transplant` repoints the parent's child
            // register away from `node`.
            let parent_dir = if right == SENTINEL {
                let parent = self.get_parent(node);
                if parent == SENTINEL {
                    None
                } else {
                    Some((parent, self.child_dir(parent, node)))
                }
            } else {
                None
            };
            self.transplant(node, right);
            (right, parent_dir)
        } else if right == SENTINEL {
            self.transplant(node, left);
            (left, None)
        } else {
            // In-order successor: leftmost node of the right subtree.
            let successor = self.find_min(right);
            let successor_right = self.get_right(successor);
            deficient_black = self.is_black(successor);

            let parent_dir = if self.get_parent(successor) != node {
                // successor is reached by a left-child chain, so it is
                // always its own parent's left child.
                self.transplant(successor, successor_right);
                self.connect(successor, right, Dir::Right);
                if successor_right == SENTINEL {
                    Some((self.get_parent(successor), Dir::Left))
                } else {
                    None
                }
            } else if successor_right == SENTINEL {
                Some((successor, Dir::Right))
            } else {
                None
            };

            self.transplant(node, successor);
            self.connect(successor, left, Dir::Left);
            self.color_node(successor, self.get_color_raw(node));

            (successor_right, parent_dir)
        };

        let payload = *self.get_node(node);
        self.deallocate(node);

        if deficient_black {
            self.fix_remove(pivot, parent_dir);
        }
        payload
    }

    fn deallocate(&mut self, node: NodeHandle) {
        self.allocator.clear_register(node, LEFT);
        self.allocator.clear_register(node, RIGHT);
        self.allocator.clear_register(node, PARENT);
        self.color_black(node);
        self.allocator.remove_node(node);
    }

    /// `node_index` is the (possibly absent) spot left deficient by the
    /// unlink phase. When it is absent, `parent_dir` carries the `(parent,
    /// side)` its vanished slot hung from, since an absent handle has no
    /// linkage of its own to read the parent back out of — the
    /// representation choice the original spec calls out explicitly.
    fn fix_remove(&mut self, mut node_index: NodeHandle, parent_dir: Option<(NodeHandle, Dir)>) {
        let mut carried = parent_dir;
        while node_index != self.root && self.is_black(node_index) {
            let (parent, dir) = match carried.take() {
                Some(pd) => pd,
                None => {
                    let parent = self.get_parent(node_index);
                    (parent, self.child_dir(parent, node_index))
                }
            };
            let mut sibling = self.get_child(parent, dir.opposite());

            if self.is_red(sibling) {
                // Case 1: red sibling, rotate it into the grandparent's slot
                // and recolor, leaving a black sibling for the remaining cases.
                self.color_black(sibling);
                self.color_red(parent);
                self.rotate_dir(parent, dir);
                sibling = self.get_child(parent, dir.opposite());
            }

            if self.is_black(self.get_child(sibling, Dir::Left))
                && self.is_black(self.get_child(sibling, Dir::Right))
            {
                // Case 2: sibling can absorb a red without violating
                // black-height; push the deficiency up to the parent.
                self.color_red(sibling);
                node_index = parent;
            } else {
                if self.is_black(self.get_child(sibling, dir.opposite())) {
                    // Case 3: sibling's near child is red, far child is
                    // black; rotate at the sibling to convert to case 4.
                    self.color_black(self.get_child(sibling, dir));
                    self.color_red(sibling);
                    self.rotate_dir(sibling, dir.opposite());
                    sibling = self.get_child(parent, dir.opposite());
                }
                // Case 4: terminates the fixup.
                self.color_node(sibling, self.get_color_raw(parent));
                self.color_black(parent);
                self.color_black(self.get_child(sibling, dir.opposite()));
                self.rotate_dir(parent, dir);
                node_index = self.root;
            }
        }
        self.color_black(node_index);
    }

    // --- replacement (§4.5) --------------------------------------------------

    /// Splices detached node `new` into `victim`'s slot, copying `victim`'s
    /// linkage verbatim. `victim` is left detached (its own linkage is
    /// cleared) but is not returned to the free list — that is the caller's
    /// call, since `new`'s key is expected to equal `victim`'s rather than
    /// this being a delete.
    pub fn replace(&mut self, victim: NodeHandle, new: NodeHandle) {
        let left = self.get_left(victim);
        let right = self.get_right(victim);
        let parent = self.get_parent(victim);
        let raw_color = self.get_color_raw(victim);

        self.allocator.set_register(new, left, LEFT);
        self.allocator.set_register(new, right, RIGHT);
        self.allocator.set_register(new, parent, PARENT);
        self.color_node(new, raw_color);

        if left != SENTINEL {
            self.allocator.set_register(left, new, PARENT);
        }
        if right != SENTINEL {
            self.allocator.set_register(right, new, PARENT);
        }
        if parent == SENTINEL {
            self.root = new;
        } else {
            let dir = self.child_dir(parent, victim);
            self.allocator.set_register(parent, new, dir.register());
        }

        self.allocator.clear_register(victim, LEFT);
        self.allocator.clear_register(victim, RIGHT);
        self.allocator.clear_register(victim, PARENT);
        self.color_black(victim);
    }

    // --- in-order traversal (§4.6) -------------------------------------------

    pub fn first(&self) -> Option<NodeHandle> {
        if self.root == SENTINEL {
            None
        } else {
            Some(self.find_min(self.root))
        }
    }

    pub fn last(&self) -> Option<NodeHandle> {
        if self.root == SENTINEL {
            None
        } else {
            Some(self.find_max(self.root))
        }
    }

    pub fn next(&self, node: NodeHandle) -> Option<NodeHandle> {
        let right = self.get_right(node);
        if right != SENTINEL {
            return Some(self.find_min(right));
        }
        let mut n = node;
        let mut p = self.get_parent(n);
        while p != SENTINEL && self.get_right(p) == n {
            n = p;
            p = self.get_parent(p);
        }
        opt(p)
    }

    pub fn prev(&self, node: NodeHandle) -> Option<NodeHandle> {
        let left = self.get_left(node);
        if left != SENTINEL {
            return Some(self.find_max(left));
        }
        let mut n = node;
        let mut p = self.get_parent(n);
        while p != SENTINEL && self.get_left(p) == n {
            n = p;
            p = self.get_parent(p);
        }
        opt(p)
    }

    // --- arena management (§4.0) ---------------------------------------------

    /// Allocates a detached node carrying `key`/`value`. Does not touch the
    /// tree's linkage; pair with `link_node` (or `replace`) to attach it.
    pub fn alloc(&mut self, key: K, value: V) -> Result<NodeHandle, TreeError> {
        if self.size() >= MAX_SIZE.saturating_sub(1) {
            return Err(TreeError::CapacityExceeded);
        }
        self.allocator
            .add_node(RBNode::new(key, value))
            .ok_or(TreeError::CapacityExceeded)
    }

    fn find(&self, key: &K) -> Option<NodeHandle> {
        let mut reference = self.root;
        while reference != SENTINEL {
            let reference_key = self.get_node(reference).key;
            reference = if *key < reference_key {
                self.get_left(reference)
            } else if *key > reference_key {
                self.get_right(reference)
            } else {
                return Some(reference);
            };
        }
        None
    }

    // --- ordered-map convenience (§4.7) --------------------------------------

    /// Inserts `key`/`value`, updating the value in place if `key` is
    /// already present. Performs the BST descent itself, then calls
    /// `link_node` + `insert_fixup`.
    pub fn insert(&mut self, key: K, value: V) -> Result<NodeHandle, TreeError> {
        let mut reference = self.root;
        if reference == SENTINEL {
            let node = self.alloc(key, value)?;
            self.link_node(node, None, Dir::Left);
            self.insert_fixup(node);
            return Ok(node);
        }
        loop {
            let reference_key = self.get_node(reference).key;
            let (target, dir) = if key < reference_key {
                (self.get_left(reference), Dir::Left)
            } else if key > reference_key {
                (self.get_right(reference), Dir::Right)
            } else {
                self.get_node_mut(reference).value = value;
                return Ok(reference);
            };
            if target == SENTINEL {
                let node = self.alloc(key, value)?;
                self.link_node(node, Some(reference), dir);
                self.insert_fixup(node);
                return Ok(node);
            }
            reference = target;
        }
    }

    /// Removes `key`, locating its node then calling `erase`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let node = self.find(key)?;
        Some(self.erase(node).value)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let node = self.find(key)?;
        Some(&self.get_node(node).value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let node = self.find(key)?;
        Some(&mut self.get_node_mut(node).value)
    }

    pub fn inorder_traversal(&self) -> Vec<(K, V)> {
        let mut stack = vec![];
        let mut curr = self.root;
        let mut nodes = vec![];
        while !stack.is_empty() || curr != SENTINEL {
            if curr != SENTINEL {
                stack.push(curr);
                curr = self.get_left(curr);
            } else {
                curr = stack.pop().unwrap();
                let node = self.get_node(curr);
                nodes.push((node.key, node.value));
                curr = self.get_right(curr);
            }
        }
        nodes
    }

    // --- debug-only invariant checking (§7, §8) ------------------------------

    /// Walks the whole tree checking invariants 1-3. Meant for tests and
    /// `debug_assert!`-gated call sites, not the hot insert/erase path.
    pub fn is_valid_red_black_tree(&self) -> bool {
        if self.root == SENTINEL {
            return true;
        }
        if self.is_red(self.root) {
            return false;
        }
        let mut stack = vec![(self.root, 0u32)];
        let mut black_counts = vec![];
        while let Some((node, mut count)) = stack.pop() {
            count += self.is_black(node) as u32;
            if self.is_leaf(node) {
                black_counts.push(count);
                continue;
            }
            for child in [self.get_left(node), self.get_right(node)] {
                if child == SENTINEL {
                    continue;
                }
                if self.is_red(node) && self.is_red(child) {
                    return false;
                }
                stack.push((child, count));
            }
        }
        black_counts.iter().all(|&c| c == black_counts[0])
    }

    pub fn pretty_print(&self)
    where
        K: std::fmt::Debug,
    {
        let mut out = String::new();
        let mut stack = vec![(self.root, String::new(), String::new())];
        while let Some((node, mut padding, pointer)) = stack.pop() {
            if node == SENTINEL {
                continue;
            }
            let key = self.get_node(node).key;
            out.push_str(&padding);
            out.push_str(&pointer);
            let label = format!("{:?}", key);
            if self.is_red(node) {
                out.push_str(&label.red().to_string());
            } else {
                out.push_str(&label);
            }
            out.push('\n');
            padding.push_str("│  ");
            let right_pointer = "└──".to_string();
            let left_pointer = if self.get_right(node) != SENTINEL {
                "├──".to_string()
            } else {
                "└──".to_string()
            };
            stack.push((self.get_right(node), padding.clone(), right_pointer));
            stack.push((self.get_left(node), padding, left_pointer));
        }
        println!("{}", out);
    }
}

impl<const MAX_SIZE: usize, K, V> Index<&K> for RedBlackTree<MAX_SIZE, K, V>
where
    K: PartialOrd + Copy + Clone + Default,
    V: Copy + Clone + Default,
{
    type Output = V;

    fn index(&self, index: &K) -> &Self::Output {
        self.get(index).expect("key not present in tree")
    }
}

impl<const MAX_SIZE: usize, K, V> IndexMut<&K> for RedBlackTree<MAX_SIZE, K, V>
where
    K: PartialOrd + Copy + Clone + Default,
    V: Copy + Clone + Default,
{
    fn index_mut(&mut self, index: &K) -> &mut Self::Output {
        self.get_mut(index).expect("key not present in tree")
    }
}

// Accessors iter.rs needs that aren't part of the public `§6` surface.
impl<const MAX_SIZE: usize, K, V> RedBlackTree<MAX_SIZE, K, V>
where
    K: PartialOrd + Copy + Clone + Default,
    V: Copy + Clone + Default,
{
    pub(crate) fn left_raw(&self, node: NodeHandle) -> NodeHandle {
        self.get_left(node)
    }

    pub(crate) fn right_raw(&self, node: NodeHandle) -> NodeHandle {
        self.get_right(node)
    }
}
