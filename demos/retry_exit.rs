//! Retry transient failures with capped exponential backoff, bailing out early on permanent ones.
use std::time::Duration;
use tandem::prelude::*;

#[derive(Debug, thiserror::Error)]
enum CallError {
    #[error("temporarily unavailable")]
    Transient,
    #[error("request rejected")]
    Permanent,
}

#[tokio::main]
async fn main() -> Result<(), TaskError<CallError>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let policy = RetryPolicy::builder()
        .times(5)
        .backoff(
            Backoff::exponential(Duration::from_millis(50))
                .with_max(Duration::from_millis(400))
                .expect("valid backoff cap"),
        )
        .with_jitter(Jitter::full())
        .build()
        .expect("valid retry policy");

    let value = policy
        .execute(|attempt| async move {
            if attempt.number() < 3 {
                return Err(Halt::Retry(CallError::Transient));
            }
            Ok::<_, Halt<CallError>>(format!("succeeded on attempt {}", attempt.number()))
        })
        .await?;
    println!("{}", value);

    let rejected: Result<(), _> =
        policy.execute(|attempt| async move { Err(attempt.exit(CallError::Permanent)) }).await;
    println!("permanent failure: {:?}", rejected);
    Ok(())
}
