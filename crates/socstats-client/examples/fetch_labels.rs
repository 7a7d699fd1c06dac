//! Fetch death-cause statistics and print them with labels.
//!
//! ```sh
//! RUST_LOG=socstats_client=debug cargo run --example fetch_labels
//! ```

use socstats_client::{parse_year_range, ClientConfig, DataQuery, StatsClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = StatsClient::new(ClientConfig::from_env()?)?;

    let query = DataQuery::new("dodsorsaker")
        .measure(1)
        .filter("ar", parse_year_range("2019-2021")?)
        .filter("kon", [1, 2])
        .max_pages(2);

    let table = client.get_data_table(&query, true).await?;

    println!("{} rows, columns: {:?}", table.len(), table.columns);
    for row in table.rows.iter().take(10) {
        println!("{}", serde_json::Value::Object(row.clone()));
    }

    let stats = client.metadata_cache_stats().await;
    println!(
        "cached metadata: {} subjects, {} variables",
        stats.cached_subjects, stats.total_variables
    );

    Ok(())
}
