//! Fetch a batch of records with at most four requests in flight.
use std::time::Duration;
use tandem::prelude::*;

#[derive(Debug, thiserror::Error)]
#[error("record {0} is missing")]
struct Missing(u32);

async fn fetch(id: u32) -> Result<String, Missing> {
    // Replace with your real I/O
    tokio::time::sleep(Duration::from_millis(20 * u64::from(id % 5))).await;
    if id == 13 {
        return Err(Missing(id));
    }
    Ok(format!("record-{}", id))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    match parallel(4, 1..=10, fetch).await {
        Ok(records) => println!("fetched {:?}", records),
        Err(err) => eprintln!("{}: {:?}", err.name(), err.errors()),
    }

    match parallel(4, 10..=15, fetch).await {
        Ok(records) => println!("fetched {:?}", records),
        Err(err) => {
            for failure in &err {
                eprintln!("failed: {}", failure);
            }
        }
    }
}
