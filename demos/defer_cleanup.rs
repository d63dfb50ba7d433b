//! Register cleanup that always runs, and let a failing close override the result.
use tandem::prelude::*;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct IoError(&'static str);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let result = defer(|scope| async move {
        println!("open connection");
        scope.defer(Deferred::new(|failure: Option<&TaskError<IoError>>| {
            match failure {
                Some(err) => println!("rollback after: {}", err),
                None => println!("commit"),
            }
            Ok(())
        }));
        scope.defer(Deferred::new_async(|_| async {
            println!("close connection");
            Ok(())
        }));
        Err::<(), _>(IoError("write failed"))
    })
    .await;
    println!("first scope: {:?}", result);

    let result = defer(|scope| async move {
        scope.defer(Deferred::new(|_| Err(IoError("flush failed"))).rethrow());
        Ok::<_, IoError>("written")
    })
    .await;
    println!("second scope: {:?}", result);
}
