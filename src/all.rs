//! Await a fixed set of independent operations.
//!
//! Every operation starts at once (there is no concurrency cap) and runs to completion; a
//! failure or panic in one never cancels the others. When all have settled, either every value
//! is returned in the input's shape or an [`AggregateError`] reports every failure in input order.
//!
//! Two entry points cover the two input shapes:
//! - [`all`]: a sequence of futures → `Vec` of values in input order.
//! - [`all_keyed`]: `(key, future)` pairs → any `FromIterator<(key, value)>` collection.
//!
//! ```rust
//! use futures::future::ready;
//! use std::collections::HashMap;
//! use tandem::{all, all_keyed};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let values = all(vec![ready(Ok::<_, ()>(1)), ready(Ok(2))]).await.unwrap();
//! assert_eq!(values, vec![1, 2]);
//!
//! let named: HashMap<&str, u32> =
//!     all_keyed(vec![("a", ready(Ok::<_, ()>(1))), ("b", ready(Ok(2)))]).await.unwrap();
//! assert_eq!(named["b"], 2);
//! # });
//! ```

use crate::parallel::{assemble, WorkItemResult};
use crate::safe::settle;
use crate::AggregateError;
use futures::future::join_all;
use std::future::Future;

/// Settle every future concurrently; values in input order, or every failure.
pub async fn all<T, E, Fut>(
    futures: impl IntoIterator<Item = Fut>,
) -> Result<Vec<T>, AggregateError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    settle_all(futures).await
}

/// Settle every keyed future concurrently; values under their keys, or every failure.
pub async fn all_keyed<K, C, T, E, Fut>(
    futures: impl IntoIterator<Item = (K, Fut)>,
) -> Result<C, AggregateError<E>>
where
    Fut: Future<Output = Result<T, E>>,
    C: FromIterator<(K, T)>,
{
    let (keys, futures): (Vec<K>, Vec<Fut>) = futures.into_iter().unzip();
    let values = settle_all(futures).await?;
    Ok(keys.into_iter().zip(values).collect())
}

async fn settle_all<T, E, Fut>(
    futures: impl IntoIterator<Item = Fut>,
) -> Result<Vec<T>, AggregateError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    let settled = join_all(futures.into_iter().enumerate().map(|(index, future)| async move {
        WorkItemResult { index, outcome: settle(future).await }
    }))
    .await;
    assemble(settled.len(), settled)
}
