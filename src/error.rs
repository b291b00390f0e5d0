use crate::Position;

/// Errors produced by the tree's public operations.
#[derive(Debug, thiserror::Error)]
pub enum OctreeError {
    /// [`crate::Tree::get_nearest`] called on a tree with no root.
    #[error("nearest-neighbor query on an empty tree")]
    EmptyTree,

    /// Two distinct elements with bit-identical positions were inserted
    /// at the same leaf. The first element remains in the tree; the
    /// second was not inserted.
    #[error("element at {0:?} coincides with an already-inserted element")]
    CoincidentPoints(Position),

    /// A non-positive `initial_size` at construction, or an empty
    /// [`crate::DiscreteScale`] evaluated with no thresholds configured.
    #[error("invalid octree configuration: {0}")]
    InvalidConfig(&'static str),
}
