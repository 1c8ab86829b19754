#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod config;
pub mod error;
pub mod loader;
pub mod store;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::Retriever;
pub use types::{ChildFailurePolicy, DocKey, Document, RetrieverConfig};
