pub mod bucket;
pub mod config;
pub mod error;
pub mod hasher;
pub mod io;
pub mod tmpfs;

pub use bucket::{Bucket, Kv, Kvs, ReadContext};
pub use config::BucketConfig;
pub use error::Error;
