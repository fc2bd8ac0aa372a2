use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::models::{parse_price, DetailFields, Listing};
use crate::pipeline::Catalog;

pub const DEFAULT_URL: &str =
    "https://lista.mercadolivre.com.br/celulares-telefones/celulares-smartphones/novo/";

/// Cursor advances by one result-page worth of items.
const PAGE_STEP: u64 = 50;

/// Roughly 30 result pages.
pub const DEFAULT_ITEM_CAP: u64 = 1501;

/// Header variants under which Mercado Livre sellers list the Anatel
/// homologation code in the spec table.
const HOMOLOGATION_HEADERS: [&str; 4] = [
    "Código de homologação (Anatel",
    "Codigo Homolog (ANATEL)",
    "Homologação Anatel Nº",
    "Número de homologação da Anatel",
];

/// Mercado Livre marketplace adapter.
pub struct MercadoLivre {
    base_url: String,
    item_cap: u64,
}

impl MercadoLivre {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            item_cap: DEFAULT_ITEM_CAP,
        }
    }

    pub fn with_item_cap(mut self, item_cap: u64) -> Self {
        self.item_cap = item_cap;
        self
    }
}

impl Default for MercadoLivre {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl Catalog for MercadoLivre {
    type Cursor = u64;

    fn name(&self) -> &'static str {
        "mercado_livre"
    }

    fn first_page(&self) -> u64 {
        1
    }

    fn page_url(&self, cursor: &u64) -> String {
        format!("{}celular_Desde_{}_NoIndex_True", self.base_url, cursor)
    }

    fn parse_listings(&self, doc: &Html) -> Vec<Listing> {
        let card_sel = Selector::parse("div.ui-search-result").unwrap();
        let title_sel = Selector::parse("h2.ui-search-item__title").unwrap();
        let price_sel = Selector::parse("span.andes-money-amount__fraction").unwrap();
        let link_sel = Selector::parse("a.ui-search-link").unwrap();

        let mut listings = Vec::new();
        for card in doc.select(&card_sel) {
            let Some(title) = card.select(&title_sel).next().map(text_of) else {
                continue;
            };
            // A card without a price fraction marks the tail of sponsored
            // filler on the closing page; nothing useful follows it.
            let Some(price_el) = card.select(&price_sel).next() else {
                break;
            };
            let Some(price) = parse_price(&text_of(price_el)) else {
                warn!(%title, "unparseable price on listing card");
                continue;
            };
            let Some(link) = card
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                warn!(%title, "listing card without a product link");
                continue;
            };

            listings.push(Listing {
                title,
                price,
                link: link.to_string(),
            });
        }
        listings
    }

    fn next_page(&self, cursor: &u64, doc: &Html) -> Option<u64> {
        let next_sel = Selector::parse("a.andes-pagination__link").unwrap();
        if doc.select(&next_sel).next().is_none() || *cursor >= self.item_cap {
            return None;
        }
        Some(cursor + PAGE_STEP)
    }

    fn parse_detail(&self, doc: &Html) -> DetailFields {
        let row_sel = Selector::parse("tr").unwrap();
        let th_sel = Selector::parse("th").unwrap();
        let td_sel = Selector::parse("td").unwrap();
        let value_sel = Selector::parse("span.andes-table__column--value").unwrap();

        let mut fields = DetailFields::default();
        for row in doc.select(&row_sel) {
            let Some(header) = row.select(&th_sel).next().map(text_of) else {
                continue;
            };

            if HOMOLOGATION_HEADERS.iter().any(|h| header.contains(h)) {
                fields.code = row
                    .select(&value_sel)
                    .next()
                    .map(|v| text_of(v).replace('-', ""));
            } else if header.contains("Marca") {
                fields.brand = row
                    .select(&td_sel)
                    .next()
                    .map(text_of)
                    .filter(|b| !b.is_empty());
            }
        }
        fields
    }
}
