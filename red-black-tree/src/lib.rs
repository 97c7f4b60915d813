//! An intrusive, arena-backed red-black tree.
//!
//! Nodes live in a fixed-capacity arena (see `node-allocator`) and refer to
//! each other by `u32` handle rather than by pointer, so the tree can sit
//! inline in a struct with no heap allocation and no lifetime parameter of
//! its own. [`tree::RedBlackTree`] exposes the linkage primitives
//! (`link_node`, `insert_fixup`, `erase`, `replace`, traversal, accessors)
//! as well as an ordered-map convenience layer (`insert`/`remove`/`get`)
//! built on top of them for callers who don't need custom placement.

pub mod error;
pub mod iter;
pub mod node;
pub mod tree;

pub use error::TreeError;
pub use iter::{RedBlackTreeIterator, RedBlackTreeIteratorMut};
pub use node::{Color, Dir, NodeHandle};
pub use node_allocator::SENTINEL;
pub use tree::{RBNode, RedBlackTree};
