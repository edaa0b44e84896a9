pub mod health;
pub mod list;
pub mod presign;

pub use health::*;
pub use list::*;
pub use presign::*;

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

/// Runs a store call, failing with [`Error::Timeout`] once `limit` elapses.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout(limit))?
}
