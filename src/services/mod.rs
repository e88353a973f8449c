pub mod collaborators;
pub mod gateway;
pub mod local_backend;
pub mod synchronizer;

pub use gateway::{QueryGateway, QueryResponse, RecordSource};
pub use local_backend::LocalBackend;
pub use synchronizer::{QuerySynchronizer, SyncEvent};
