pub mod cache;
pub mod commit;
pub mod node;
pub mod tree;

pub use cache::{FileCache, NodeInfo};
pub use node::{CachedNode, CachedNodeType, OldType};
pub use tree::ShadowTree;
