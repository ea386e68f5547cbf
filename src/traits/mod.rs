//! Backend capability traits

mod backend;

pub use backend::{BackendAdapter, ProviderSession};
