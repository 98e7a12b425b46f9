pub mod backend;
pub mod memory;
pub mod mutex;
pub mod types;

pub use backend::{Backend, BulkRequest};
pub use memory::InMemoryBackend;
pub use mutex::{BackendMutex, MutexAcquireOutcome};
pub use types::{BasicFileEntry, BasicFileType, FileEntry, FileMeta, FileType};
