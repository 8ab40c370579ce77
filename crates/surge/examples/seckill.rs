//! Flash-Sale Example
//!
//! Fifty users race for ten vouchers; one of them also double-submits.
//! Exactly ten orders are placed, the double submission is rejected.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use surge::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cache = Arc::new(MemoryCache::new());
    let store = Arc::new(MemoryOrderStore::new());
    let flow = Arc::new(SeckillFlow::new(cache, store.clone()));

    store.put_voucher(VoucherStock {
        voucher_id: 1,
        stock: 10,
        begin_time: Utc::now() - chrono::Duration::minutes(1),
        end_time: Utc::now() + chrono::Duration::minutes(10),
    });

    println!("=== Flash-Sale Demo: 50 users, 10 vouchers ===\n");

    let mut handles = Vec::new();
    for user_id in 1..=50u64 {
        let flow = flow.clone();
        handles.push(tokio::spawn(async move {
            (user_id, flow.place(1, user_id).await)
        }));
    }

    let mut placed = 0;
    for handle in handles {
        let (user_id, result) = handle.await.expect("task panicked");
        match result? {
            Placement::Placed { order_id } => {
                placed += 1;
                println!("user {user_id:2}: ✓ order {order_id}");
            }
            Placement::Rejected(rejection) => {
                println!("user {user_id:2}: ✗ {}", rejection.reason());
            }
        }
    }

    println!("\nplaced={placed}, remaining stock={:?}", store.stock_of(1));

    // a second attempt from the same user never produces a second order
    tokio::time::sleep(Duration::from_millis(50)).await;
    let duplicate = flow.place(1, 1).await?;
    match duplicate {
        Placement::Placed { .. } => println!("user  1: placed twice?!"),
        Placement::Rejected(rejection) => {
            println!("user  1 again: ✗ {}", rejection.reason());
        }
    }

    Ok(())
}
