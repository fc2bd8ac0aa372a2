use std::collections::HashSet;
use std::thread;
use std::time::Duration;

use scraper::Html;
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::fetch::{Fetch, Fetcher};
use crate::models::{merge_and_filter, DetailFields, Listing, ProductRecord};
use crate::store::ResultStore;

/// Site-specific knowledge the shared pipeline is parameterized over: how to
/// build page URLs, walk pagination, and read listing cards and detail pages.
pub trait Catalog: Sync {
    /// Pagination state (Mercado Livre counts items, Americanas tracks
    /// page/offset pairs).
    type Cursor;

    fn name(&self) -> &'static str;

    fn first_page(&self) -> Self::Cursor;

    fn page_url(&self, cursor: &Self::Cursor) -> String;

    /// Summary rows on one results page.
    fn parse_listings(&self, doc: &Html) -> Vec<Listing>;

    /// Cursor for the following page, or `None` when the page carries no
    /// next-page link or the item cap is reached.
    fn next_page(&self, cursor: &Self::Cursor, doc: &Html) -> Option<Self::Cursor>;

    /// Homologation code and brand from one detail page.
    fn parse_detail(&self, doc: &Html) -> DetailFields;

    /// Politeness delay between listing pages.
    fn page_delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// The concurrent link-processing core shared by both scrapers: a paginated
/// listing crawl feeding a fixed-size worker pool that fetches detail pages
/// and records extracted fields in a shared store.
pub struct Pipeline<C: Catalog, F: Fetch = Fetcher> {
    catalog: C,
    fetcher: F,
    workers: usize,
}

impl<C: Catalog, F: Fetch> Pipeline<C, F> {
    pub fn new(catalog: C, fetcher: F, workers: usize) -> Self {
        Self {
            catalog,
            fetcher,
            workers: workers.max(1),
        }
    }

    /// Walk the paginated results, collecting summary rows until no next
    /// page exists. A network failure here aborts the whole crawl; there is
    /// no partial-page retry.
    pub fn crawl_listings(&self) -> Result<Vec<Listing>, ScrapeError> {
        let mut rows: Vec<Listing> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut cursor = self.catalog.first_page();

        loop {
            let url = self.catalog.page_url(&cursor);
            info!(catalog = self.catalog.name(), %url, "fetching listing page");
            let body = self.fetcher.get(&url)?;
            let doc = Html::parse_document(&body);

            let listings = self.catalog.parse_listings(&doc);
            debug!(count = listings.len(), "parsed listing cards");
            for listing in listings {
                // Links are the join key for the detail phase; the same
                // product advertised twice is recorded once.
                if seen.insert(listing.link.clone()) {
                    rows.push(listing);
                }
            }

            match self.catalog.next_page(&cursor, &doc) {
                Some(next) => cursor = next,
                None => break,
            }

            let delay = self.catalog.page_delay();
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }

        Ok(rows)
    }

    /// Drain the link queue with a fixed-size worker pool. Each worker
    /// fetches one detail page and writes the extracted fields into the
    /// shared store under lock. Per-link failures are logged and recorded as
    /// missing fields; nothing is retried.
    pub fn process_details(&self, listings: &[Listing]) -> Result<ResultStore, ScrapeError> {
        let store = ResultStore::new();
        let links: Vec<&str> = listings.iter().map(|l| l.link.as_str()).collect();

        info!(
            catalog = self.catalog.name(),
            links = links.len(),
            workers = self.workers,
            "starting detail workers"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;

        pool.install(|| {
            use rayon::prelude::*;

            links.par_iter().for_each(|link| match self.fetcher.get(link) {
                Ok(body) => {
                    let doc = Html::parse_document(&body);
                    let fields = self.catalog.parse_detail(&doc);
                    if fields.code.is_none() {
                        debug!(%link, "no homologation code on detail page");
                    }
                    store.put_code(link, fields.code);
                    store.put_brand(link, fields.brand);
                }
                Err(e) => {
                    warn!(%link, error = %e, "detail fetch failed");
                    store.put_code(link, None);
                    store.put_brand(link, None);
                }
            });
        });

        info!(
            catalog = self.catalog.name(),
            processed = store.links_processed(),
            with_code = store.codes_recorded(),
            "detail workers finished"
        );

        Ok(store)
    }

    /// Full pipeline: crawl the listing pages, process every detail link,
    /// merge and filter into the final table.
    pub fn run(&self) -> Result<Vec<ProductRecord>, ScrapeError> {
        let listings = self.crawl_listings()?;
        info!(
            catalog = self.catalog.name(),
            listings = listings.len(),
            "listing crawl complete"
        );

        let store = self.process_details(&listings)?;
        let records = merge_and_filter(&listings, &store);
        info!(
            catalog = self.catalog.name(),
            records = records.len(),
            "pipeline complete"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Minimal catalog over hand-rolled fixture markup: listing pages hold
    /// `div.card` entries, pagination follows `a.next`, detail pages expose
    /// `span.anatel` and `span.marca`.
    struct StubCatalog;

    impl Catalog for StubCatalog {
        type Cursor = u32;

        fn name(&self) -> &'static str {
            "stub"
        }

        fn first_page(&self) -> u32 {
            1
        }

        fn page_url(&self, cursor: &u32) -> String {
            format!("https://shop.test/page/{cursor}")
        }

        fn parse_listings(&self, doc: &Html) -> Vec<Listing> {
            let card_sel = Selector::parse("div.card").unwrap();
            let title_sel = Selector::parse("h2").unwrap();
            let price_sel = Selector::parse("span.price").unwrap();
            let link_sel = Selector::parse("a").unwrap();

            doc.select(&card_sel)
                .filter_map(|card| {
                    Some(Listing {
                        title: card.select(&title_sel).next()?.text().collect(),
                        price: card
                            .select(&price_sel)
                            .next()?
                            .text()
                            .collect::<String>()
                            .parse()
                            .ok()?,
                        link: card
                            .select(&link_sel)
                            .next()?
                            .value()
                            .attr("href")?
                            .to_string(),
                    })
                })
                .collect()
        }

        fn next_page(&self, cursor: &u32, doc: &Html) -> Option<u32> {
            let next_sel = Selector::parse("a.next").unwrap();
            doc.select(&next_sel).next().map(|_| cursor + 1)
        }

        fn parse_detail(&self, doc: &Html) -> DetailFields {
            let code_sel = Selector::parse("span.anatel").unwrap();
            let brand_sel = Selector::parse("span.marca").unwrap();
            DetailFields {
                code: doc.select(&code_sel).next().map(|c| c.text().collect()),
                brand: doc.select(&brand_sel).next().map(|b| b.text().collect()),
            }
        }
    }

    /// In-memory page server; unknown URLs return an empty document, the
    /// same shape a detail page with no spec table has.
    struct FixtureFetcher {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl FixtureFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests_for(&self, url: &str) -> usize {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.as_str() == url)
                .count()
        }

        fn total_requests(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Fetch for FixtureFetcher {
        fn get(&self, url: &str) -> Result<String, ScrapeError> {
            self.requests.lock().unwrap().push(url.to_string());
            Ok(self
                .pages
                .get(url)
                .cloned()
                .unwrap_or_else(|| "<html></html>".to_string()))
        }
    }

    fn card(title: &str, price: &str, href: &str) -> String {
        format!(
            r#"<div class="card"><h2>{title}</h2><span class="price">{price}</span><a href="{href}">ver</a></div>"#
        )
    }

    fn detail(code: &str, brand: &str) -> String {
        format!(r#"<span class="anatel">{code}</span><span class="marca">{brand}</span>"#)
    }

    #[test]
    fn crawl_stops_after_page_without_next_link() {
        let page = format!("<body>{}</body>", card("Phone A", "100", "https://shop.test/a"));
        let fetcher = FixtureFetcher::new(&[("https://shop.test/page/1", page.as_str())]);

        let pipeline = Pipeline::new(StubCatalog, &fetcher, 2);
        let listings = pipeline.crawl_listings().unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].link, "https://shop.test/a");
        // Exactly one page was fetched: no next link means no second request.
        assert_eq!(fetcher.total_requests(), 1);
    }

    #[test]
    fn repeated_links_are_recorded_once() {
        let page1 = format!(
            r##"<body>{}{}<a class="next" href="#">2</a></body>"##,
            card("Phone A", "100", "https://shop.test/a"),
            card("Phone B", "200", "https://shop.test/b"),
        );
        // Page 2 re-advertises Phone B.
        let page2 = format!(
            "<body>{}{}</body>",
            card("Phone B", "200", "https://shop.test/b"),
            card("Phone C", "300", "https://shop.test/c"),
        );
        let fetcher = FixtureFetcher::new(&[
            ("https://shop.test/page/1", page1.as_str()),
            ("https://shop.test/page/2", page2.as_str()),
        ]);

        let pipeline = Pipeline::new(StubCatalog, &fetcher, 2);
        let listings = pipeline.crawl_listings().unwrap();

        let links: Vec<_> = listings.iter().map(|l| l.link.as_str()).collect();
        assert_eq!(
            links,
            vec!["https://shop.test/a", "https://shop.test/b", "https://shop.test/c"]
        );
    }

    #[test]
    fn run_produces_merged_filtered_table() {
        let page1 = format!(
            r##"<body>{}{}<a class="next" href="#">2</a></body>"##,
            card("Phone A", "100", "https://shop.test/a"),
            card("Phone B", "0", "https://shop.test/b"),
        );
        let page2 = format!(
            "<body>{}{}</body>",
            // Phone A advertised again; its detail page must be fetched once.
            card("Phone A", "100", "https://shop.test/a"),
            card("Phone C", "300", "https://shop.test/c"),
        );
        let detail_a = detail("111-22-333", "Acme");
        let detail_b = detail("444-55-666", "Acme");
        let fetcher = FixtureFetcher::new(&[
            ("https://shop.test/page/1", page1.as_str()),
            ("https://shop.test/page/2", page2.as_str()),
            ("https://shop.test/a", detail_a.as_str()),
            ("https://shop.test/b", detail_b.as_str()),
            // Phone C has no fixture: its detail parse yields no code.
        ]);

        let pipeline = Pipeline::new(StubCatalog, &fetcher, 2);
        let records = pipeline.run().unwrap();

        // Phone B has price 0 and Phone C has no code; only Phone A survives.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].code, "111-22-333");
        assert_eq!(records[0].brand.as_deref(), Some("Acme"));
        assert_eq!(records[0].price, 100.0);

        assert_eq!(fetcher.requests_for("https://shop.test/a"), 1);
        assert_eq!(fetcher.requests_for("https://shop.test/c"), 1);
    }
}
