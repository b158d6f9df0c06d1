//! Batch operations example for the Riak HTTP client
//!
//! Run with: SZ_RIAK_CONCURRENCY=4 cargo run --example batch_operations

use riak_http::{Client, PutRequest};
use serde_json::json;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let client = Client::new("examples")?;
    info!(
        "=== Batch Operations Example (limit {}) ===",
        client.config().concurrency_limit
    );

    let keys: Vec<String> = (1..=10).map(|i| format!("batch:user:{}", i)).collect();
    let requests = keys
        .iter()
        .enumerate()
        .map(|(i, key)| PutRequest::new(key.clone(), json!({"id": i + 1, "role": "user"})))
        .collect();

    let stored = client.batch_put(requests).await?;
    info!("Stored {} objects", stored.len());

    let fetched = client.batch_get(&keys).await?;
    for (key, result) in keys.iter().zip(&fetched) {
        info!("  GET {} -> {}", key, result.value.to_json());
    }

    client.batch_delete(&keys).await?;
    info!("Batch operations example completed!");
    Ok(())
}
