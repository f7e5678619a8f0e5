//! Object-store provider implementations.

#[cfg(feature = "http")]
pub mod http;
pub mod local;
pub mod resolver;
#[cfg(feature = "s3")]
pub mod s3;

#[cfg(feature = "http")]
pub use http::HttpPutObjectStore;
pub use local::LocalObjectStore;
pub use resolver::{ConfigStoreResolver, FixedStoreResolver, StoreResolver};
#[cfg(feature = "s3")]
pub use s3::{S3ObjectStore, S3Settings};
