//! Browser front end and presigning proxy for S3-compatible object stores.
//!
//! The backend lists a bucket and hands out short-lived presigned URLs; file
//! bytes travel directly between the browser and the store.

pub mod bucket;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod storage;

pub use config::Config;
pub use error::{Error, Result};
pub use server::{build_app, AppState};
