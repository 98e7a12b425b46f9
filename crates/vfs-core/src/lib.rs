pub mod cli;
pub mod config;
pub mod error;

pub use cli::{parse_args, Args, Command};
pub use config::VfsConfig;
pub use error::{ErrorKind, VfsError, VfsResult};
