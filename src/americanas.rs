use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::models::{parse_price, DetailFields, Listing};
use crate::pipeline::Catalog;

pub const DEFAULT_URL: &str = "https://www.americanas.com.br/categoria/celulares-e-smartphones/g/condicao-novo/tipo-de-produto-celular/tipo-de-produto-Smartphone?viewMode=list";

const SITE_ROOT: &str = "https://www.americanas.com.br";

/// Items per results page.
const PAGE_LIMIT: u32 = 24;

/// Offset cap, roughly 30 result pages.
pub const DEFAULT_ITEM_CAP: u32 = 840;

/// Seconds to wait between listing pages; the retail site throttles
/// aggressive pagination.
const PAGE_DELAY_SECS: u64 = 3;

/// Header variants under which Americanas lists the Anatel homologation code
/// in the spec drawer.
const HOMOLOGATION_HEADERS: [&str; 2] =
    ["Código de homologação (Anatel", "Codigo Homolog (ANATEL)"];

/// Pagination state: 1-based page number plus the item offset the site
/// expects alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub offset: u32,
}

/// Americanas retail-site adapter.
pub struct Americanas {
    base_url: String,
    item_cap: u32,
}

impl Americanas {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            item_cap: DEFAULT_ITEM_CAP,
        }
    }

    pub fn with_item_cap(mut self, item_cap: u32) -> Self {
        self.item_cap = item_cap;
        self
    }
}

impl Default for Americanas {
    fn default() -> Self {
        Self::new(DEFAULT_URL)
    }
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl Catalog for Americanas {
    type Cursor = PageCursor;

    fn name(&self) -> &'static str {
        "americanas"
    }

    fn first_page(&self) -> PageCursor {
        PageCursor { page: 1, offset: 0 }
    }

    fn page_url(&self, cursor: &PageCursor) -> String {
        format!(
            "{}&page={}&limit={}&offset={}",
            self.base_url, cursor.page, PAGE_LIMIT, cursor.offset
        )
    }

    fn parse_listings(&self, doc: &Html) -> Vec<Listing> {
        // The site ships CSS-in-JS class names; the stable fragments are the
        // human-readable suffixes.
        let card_sel = Selector::parse(r#"div[class*="theme-grid-col"]"#).unwrap();
        let title_sel = Selector::parse(r#"h3[class*="product-name"]"#).unwrap();
        let price_sel = Selector::parse(r#"span[class*="list-price"]"#).unwrap();
        let link_sel = Selector::parse(r#"a[aria-current="page"]"#).unwrap();

        let mut listings = Vec::new();
        for card in doc.select(&card_sel) {
            let Some(title) = card.select(&title_sel).next().map(text_of) else {
                continue;
            };
            // Cards without a promotional price are unavailable offers.
            let Some(price_el) = card.select(&price_sel).next() else {
                continue;
            };
            let Some(price) = parse_price(&text_of(price_el)) else {
                warn!(%title, "unparseable price on listing card");
                continue;
            };
            let Some(href) = card
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
                link: format!("{SITE_ROOT}{href}"),
            });
        }
        listings
    }

    fn next_page(&self, cursor: &PageCursor, doc: &Html) -> Option<PageCursor> {
        let next_sel = Selector::parse(r#"a[class*="PageLink"]"#).unwrap();
        if doc.select(&next_sel).next().is_none() || cursor.offset >= self.item_cap {
            return None;
        }
        Some(PageCursor {
            page: cursor.page + 1,
            offset: cursor.offset + PAGE_LIMIT,
        })
    }

    fn parse_detail(&self, doc: &Html) -> DetailFields {
        let cell_sel = Selector::parse(r#"td[class*="spec-drawer"]"#).unwrap();
        let cells: Vec<String> = doc.select(&cell_sel).map(text_of).collect();

        let mut fields = DetailFields::default();
        for (i, cell) in cells.iter().enumerate() {
            if HOMOLOGATION_HEADERS.iter().any(|h| cell.contains(h)) {
                fields.code = cells.get(i + 1).map(|c| c.replace('-', ""));
            } else if cell == "Marca" {
                fields.brand = cells.get(i + 1).cloned().filter(|b| !b.is_empty());
            }
        }
        fields
    }

    fn page_delay(&self) -> Duration {
        Duration::from_secs(PAGE_DELAY_SECS)
    }
}
