//! Basic usage example for the Riak HTTP client
//!
//! Run with: SZ_RIAK_HOST=127.0.0.1 cargo run --example basic_usage

use riak_http::{Client, IndexQuery};
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
    info!("Using {}", client.url("example:hello"));

    // Raw text is stored as text/plain
    let stored = client.put("example:hello", "Hello, Riak!", None).await?;
    info!("Stored text, vclock: {}", stored.value.metadata.vclock);

    // Objects are stored as JSON; metadata fields travel as headers
    let alice = json!({
        "name": "Alice",
        "city": "NYC",
        "links": [{"link": "/buckets/examples/keys/example:hello", "tag": "greeting"}],
        "meta": {"source": "basic_usage"},
        "index": {"city_bin": "NYC"}
    });
    client.put("user:alice", alice, None).await?;

    let fetched = client.get("user:alice").await?;
    info!("Retrieved: {}", fetched.value.to_json());
    for link in &fetched.value.metadata.links {
        info!("  link {} tagged {:?}", link.link, link.tag);
    }

    let by_city = client
        .index_query("city_bin", &IndexQuery::Exact("NYC".to_string()), &[])
        .await?;
    info!("Keys in NYC: {:?}", by_city.keys);

    // Missing keys read as empty values
    let missing = client.get("example:missing").await?;
    info!("Missing key empty: {}", missing.value.is_empty());

    client.delete("example:hello").await?;
    client.delete("user:alice").await?;
    info!("Example completed successfully!");
    Ok(())
}
