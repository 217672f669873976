//! Basic usage example for the time wheel

use timewheel::{job_async, job_fn, Duration, TimeWheel, WheelConfig};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let mut wheel = TimeWheel::new(
        WheelConfig::builder()
            .name("example_wheel")
            .tick_interval(Duration::from_secs(1))
            .slot_count(10)
            .build(),
    );
    wheel.start()?;

    let (expired_tx, mut expired_rx) = mpsc::unbounded_channel();

    // Set multiple timers; the long one needs a full extra rotation
    for (name, secs) in [("short_timer", 1), ("medium_timer", 2), ("long_timer", 12)] {
        wheel
            .add_timer(
                Duration::from_secs(secs),
                Some(name.to_string()),
                job_async(
                    |(tx, name): (mpsc::UnboundedSender<&'static str>, &'static str)| async move {
                        let _ = tx.send(name);
                    },
                    (expired_tx.clone(), name),
                ),
            )
            .await?;
    }

    // Blocking callbacks receive their captured arguments
    wheel
        .add_timer(
            Duration::from_secs(3),
            None,
            job_fn(|(lease, ttl): (u64, u32)| println!("Lease {} expired after {}s", lease, ttl), (7, 3)),
        )
        .await?;

    println!("Timers set! Waiting for expiration...");

    let mut expired_count = 0;
    while expired_count < 3 {
        if let Some(name) = expired_rx.recv().await {
            println!("Timer '{}' expired!", name);
            expired_count += 1;
        }
    }

    // Demonstrate cancellation
    wheel
        .add_timer(
            Duration::from_secs(10),
            Some("cancelled_timer".to_string()),
            job_fn(|_: ()| println!("This never prints"), ()),
        )
        .await?;
    println!("Set a timer that will be cancelled...");

    wheel.remove_timer("cancelled_timer".to_string()).await?;
    println!("Timer cancelled!");

    wheel.stop().await?;

    println!("Time wheel shut down successfully!");
    Ok(())
}
