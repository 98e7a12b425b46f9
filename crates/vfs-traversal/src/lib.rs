pub mod traversal;

pub use traversal::{du, walk_bfs, TraversalEntry};
