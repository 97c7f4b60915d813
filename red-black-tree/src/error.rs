use thiserror::Error;

/// Errors surfaced by the arena underneath the tree.
///
/// The red-black balancing algorithms themselves are infallible (their
/// preconditions are caller obligations, not runtime-checked ones); the one
/// place this crate can legitimately fail at runtime is running out of
/// arena capacity when allocating a new node.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("red-black tree arena is at capacity")]
    CapacityExceeded,
}
