//! Sequential async helpers: one item at a time, in input order, stopping at the first error.

use std::future::Future;

/// Await `f(item)` for each item in turn, collecting the values.
pub async fn map<I, T, E, F, Fut>(
    items: impl IntoIterator<Item = I>,
    mut f: F,
) -> Result<Vec<T>, E>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let items = items.into_iter();
    let mut values = Vec::with_capacity(items.size_hint().0);
    for item in items {
        values.push(f(item).await?);
    }
    Ok(values)
}

/// Async left fold.
pub async fn reduce<I, A, E, F, Fut>(
    items: impl IntoIterator<Item = I>,
    init: A,
    mut f: F,
) -> Result<A, E>
where
    F: FnMut(A, I) -> Fut,
    Fut: Future<Output = Result<A, E>>,
{
    let mut acc = init;
    for item in items {
        acc = f(acc, item).await?;
    }
    Ok(acc)
}
