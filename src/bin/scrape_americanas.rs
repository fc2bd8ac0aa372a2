use anatel_price_scraper::{americanas, config, db, matcher};
use anatel_price_scraper::{Americanas, Credentials, Database, Fetcher, Pipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Americanas Smartphone Scraper");
    println!("=============================\n");

    let credentials = Credentials::from_env()?;

    let start_url = std::env::var("AMERICANAS_START_URL")
        .unwrap_or_else(|_| americanas::DEFAULT_URL.to_string());
    let workers = config::env_parse("AMERICANAS_WORKERS", 2usize);
    let item_cap = config::env_parse("AMERICANAS_ITEM_CAP", americanas::DEFAULT_ITEM_CAP);

    println!("Configuration:");
    println!("  Start URL: {start_url}");
    println!("  Detail workers: {workers}");
    println!("  Item cap: {item_cap}");
    println!("  Proxies: {}", credentials.americanas.proxies.len());
    println!();

    let fetcher = Fetcher::new(
        &credentials.americanas.headers,
        credentials.americanas.proxies.clone(),
    )?;
    let catalog = Americanas::new(start_url).with_item_cap(item_cap);
    let pipeline = Pipeline::new(catalog, fetcher, workers);

    let records = tokio::task::spawn_blocking(move || pipeline.run()).await??;
    println!("✓ Scraped {} listings with a homologation code", records.len());

    println!("Connecting to PostgreSQL...");
    let database = Database::connect(&credentials.database).await?;
    database.ensure_tables().await?;

    // Only products also present in the Mercado Livre table are persisted;
    // the marketplace table is the reference catalog.
    let reference_codes = database.mercado_livre_codes().await?;
    println!("✓ Loaded {} Mercado Livre codes for matching", reference_codes.len());

    let scraped = records.len();
    let matched = matcher::retain_matching(records, &reference_codes);
    println!("✓ {} of {scraped} rows match the reference catalog", matched.len());

    let inserted = database.insert_americanas(&matched).await;
    let total = database.row_count(db::AMERICANAS_TABLE).await?;

    println!("\n{}", "=".repeat(50));
    println!("✓ Scraping Complete!");
    println!("{}", "=".repeat(50));
    println!("  Rows scraped:  {scraped}");
    println!("  Rows matched:  {}", matched.len());
    println!("  Rows inserted: {inserted}");
    println!("  Rows failed:   {}", matched.len() - inserted);
    println!("  Table '{}' now holds {total} rows", db::AMERICANAS_TABLE);
    println!("{}", "=".repeat(50));

    Ok(())
}
