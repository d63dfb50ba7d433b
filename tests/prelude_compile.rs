//! Compile-time prelude coverage test.
use std::time::Duration;
use tandem::prelude::*;

#[tokio::test]
async fn prelude_reexports_core_types() {
    let _backoff = Backoff::constant(Duration::from_millis(100));
    let _jitter = Jitter::None;
    let policy = RetryPolicy::builder()
        .times(2)
        .backoff(Backoff::linear(Duration::from_millis(1)))
        .with_sleeper(InstantSleeper)
        .build()
        .expect("valid retry policy");

    let value = defer(|scope: DeferScope<std::io::Error>| async move {
        scope.defer(Deferred::new(|_| Ok(())));
        let doubled =
            parallel(2, vec![1, 2, 3], |x| async move { Ok::<_, std::io::Error>(x * 2) }).await;
        Ok(doubled.map(|v| v.iter().sum::<i32>()).unwrap_or_default())
    })
    .await
    .expect("defer scope failed");
    assert_eq!(value, 12);

    let retried = policy
        .execute(|attempt| async move { Ok::<_, Halt<std::io::Error>>(attempt.number()) })
        .await
        .expect("retry failed");
    assert_eq!(retried, 1);

    let settled: Result<Vec<u8>, AggregateError<std::io::Error>> =
        all(vec![futures::future::ready(Ok(1u8))]).await;
    assert_eq!(settled.ok(), Some(vec![1]));
}
