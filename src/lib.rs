pub mod americanas;
pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod matcher;
pub mod mercado_livre;
pub mod models;
pub mod pipeline;
pub mod store;

// Re-export main types
pub use americanas::Americanas;
pub use config::Credentials;
pub use db::Database;
pub use error::ScrapeError;
pub use fetch::{Fetch, Fetcher};
pub use mercado_livre::MercadoLivre;
pub use models::{DetailFields, Listing, ProductRecord};
pub use pipeline::{Catalog, Pipeline};
pub use store::ResultStore;
