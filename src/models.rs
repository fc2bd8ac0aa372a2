use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::store::ResultStore;

/// Codes scraped as this literal are treated the same as a missing code.
pub const PLACEHOLDER_CODE: &str = "Null";

/// One summary row from a paginated results page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub title: String,
    pub price: f64,
    pub link: String,
}

/// Fields extracted from a single detail page. Missing markup yields `None`,
/// never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailFields {
    pub code: Option<String>,
    pub brand: Option<String>,
}

/// A listing merged with its detail fields that survived the final filter:
/// the homologation code is present and not the placeholder, and the price
/// is positive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub code: String,
    pub title: String,
    pub brand: Option<String>,
    pub price: f64,
    pub link: String,
}

/// Extract a price from a Brazilian-formatted price string.
///
/// Accepts the bare fraction text Mercado Livre renders (`"1.234"`) as well
/// as full price labels (`"R$ 1.234,56"`). Thousands separators are dots,
/// the decimal separator is a comma.
pub fn parse_price(raw: &str) -> Option<f64> {
    static PRICE_RE: OnceLock<Regex> = OnceLock::new();
    let re = PRICE_RE.get_or_init(|| Regex::new(r"\d+(?:\.\d{3})*(?:,\d{2})?").unwrap());
    let token = re.find(raw)?.as_str();
    token.replace('.', "").replace(',', ".").parse().ok()
}

/// Join listings with the detail store by link and drop rows that fail the
/// final invariant. Surviving rows keep crawl order.
pub fn merge_and_filter(listings: &[Listing], store: &ResultStore) -> Vec<ProductRecord> {
    listings
        .iter()
        .filter_map(|listing| {
            let code = store.code_for(&listing.link)?;
            if code.is_empty() || code == PLACEHOLDER_CODE || listing.price <= 0.0 {
                return None;
            }
            Some(ProductRecord {
                code,
                title: listing.title.clone(),
                brand: store.brand_for(&listing.link),
                price: listing.price,
                link: listing.link.clone(),
            })
        })
        .collect()
}
