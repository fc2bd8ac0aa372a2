use std::collections::HashMap;
use std::sync::Mutex;

/// Shared result store written by the detail workers.
///
/// Holds the code-by-link and brand-by-link maps behind their own mutexes;
/// the map writes are the only mutation points in the detail phase. A link
/// can be recorded with a `None` value when the page was fetched but the
/// field was missing, which filters out the same as a never-processed link.
#[derive(Debug, Default)]
pub struct ResultStore {
    codes: Mutex<HashMap<String, Option<String>>>,
    brands: Mutex<HashMap<String, Option<String>>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_code(&self, link: &str, code: Option<String>) {
        self.codes.lock().unwrap().insert(link.to_string(), code);
    }

    pub fn put_brand(&self, link: &str, brand: Option<String>) {
        self.brands.lock().unwrap().insert(link.to_string(), brand);
    }

    /// Code recorded for a link, flattened: absent link and recorded-missing
    /// both come back as `None`.
    pub fn code_for(&self, link: &str) -> Option<String> {
        self.codes.lock().unwrap().get(link).cloned().flatten()
    }

    pub fn brand_for(&self, link: &str) -> Option<String> {
        self.brands.lock().unwrap().get(link).cloned().flatten()
    }

    /// Number of links the workers touched, successful or not.
    pub fn links_processed(&self) -> usize {
        self.codes.lock().unwrap().len()
    }

    /// Number of links that actually yielded a code.
    pub fn codes_recorded(&self) -> usize {
        self.codes
            .lock()
            .unwrap()
            .values()
            .filter(|v| v.is_some())
            .count()
    }
}
