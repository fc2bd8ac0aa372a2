use anatel_price_scraper::{config, db, mercado_livre};
use anatel_price_scraper::{Credentials, Database, Fetcher, MercadoLivre, Pipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Mercado Livre Smartphone Scraper");
    println!("================================\n");

    let credentials = Credentials::from_env()?;

    let start_url = std::env::var("ML_START_URL")
        .unwrap_or_else(|_| mercado_livre::DEFAULT_URL.to_string());
    let workers = config::env_parse("ML_WORKERS", 3usize);
    let item_cap = config::env_parse("ML_ITEM_CAP", mercado_livre::DEFAULT_ITEM_CAP);

    println!("Configuration:");
    println!("  Start URL: {start_url}");
    println!("  Detail workers: {workers}");
    println!("  Item cap: {item_cap}");
    println!();

    let fetcher = Fetcher::new(
        &credentials.mercado_livre.headers,
        credentials.mercado_livre.proxies.clone(),
    )?;
    let catalog = MercadoLivre::new(start_url).with_item_cap(item_cap);
    let pipeline = Pipeline::new(catalog, fetcher, workers);

    let records = tokio::task::spawn_blocking(move || pipeline.run()).await??;
    println!("✓ Scraped {} listings with a homologation code", records.len());

    println!("Connecting to PostgreSQL...");
    let database = Database::connect(&credentials.database).await?;
    database.ensure_tables().await?;

    let inserted = database.insert_mercado_livre(&records).await;
    let total = database.row_count(db::MERCADO_LIVRE_TABLE).await?;

    println!("\n{}", "=".repeat(50));
    println!("✓ Scraping Complete!");
    println!("{}", "=".repeat(50));
    println!("  Rows scraped:  {}", records.len());
    println!("  Rows inserted: {inserted}");
    println!("  Rows failed:   {}", records.len() - inserted);
    println!("  Table '{}' now holds {total} rows", db::MERCADO_LIVRE_TABLE);
    println!("{}", "=".repeat(50));

    Ok(())
}
