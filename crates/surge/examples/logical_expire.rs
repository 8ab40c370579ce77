//! Logical-Expiration Example
//!
//! Warms a key, reads it fresh, lets it logically expire, then shows stale
//! data being served while a single background rebuild refreshes it.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use surge::prelude::*;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Shop {
    id: u64,
    name: String,
}

struct ShopLoader {
    loads: AtomicUsize,
}

#[async_trait]
impl Loader<u64, Shop> for ShopLoader {
    async fn load(&self, id: &u64) -> Result<Option<Shop>> {
        let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        // stand-in for a slow store query
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok(Some(Shop {
            id: *id,
            name: format!("Noodle Bar (rebuild #{n})"),
        }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cache = Arc::new(MemoryCache::new());
    let client = CacheClient::new(cache);
    let loader = Arc::new(ShopLoader {
        loads: AtomicUsize::new(0),
    });

    println!("=== Logical Expiration Demo ===\n");

    // Warm the hot key with a 1-second logical TTL
    let shop = Shop {
        id: 1,
        name: "Noodle Bar".to_string(),
    };
    client
        .set_with_logical_expire("shop:1", &shop, Duration::from_secs(1))
        .await?;
    println!("✓ Warmed 'shop:1' with logical TTL=1s");

    // Immediately: fresh, no loader call
    let fresh = client
        .query_with_logical_expire("shop:", &1u64, loader.clone(), Duration::from_secs(1))
        .await?;
    println!("T+0s: {:?}", fresh.map(|s| s.name));

    println!("\n⏳ Waiting 2 seconds for the logical expiry...\n");
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Expired: the stale payload is served, one rebuild starts behind it
    for i in 0..3 {
        let result = client
            .query_with_logical_expire("shop:", &1u64, loader.clone(), Duration::from_secs(1))
            .await?;
        println!("T+2s read {}: {:?}", i + 1, result.map(|s| s.name));
    }

    println!("\n⏳ Letting the background rebuild finish...\n");
    tokio::time::sleep(Duration::from_millis(400)).await;

    let rebuilt = client
        .query_with_logical_expire("shop:", &1u64, loader.clone(), Duration::from_secs(1))
        .await?;
    println!("T+2.4s: {:?}", rebuilt.map(|s| s.name));
    println!("Loader calls: {}", loader.loads.load(Ordering::SeqCst));

    println!("\n✅ Stale served, exactly one rebuild per episode!");

    Ok(())
}
