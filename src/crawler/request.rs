use crate::url::parse_http_url;
use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Most seed URLs a single crawl may start from
pub const MAX_SEED_URLS: usize = 8;

/// Most keywords a single crawl may count
pub const MAX_KEYWORDS: usize = 20;

/// Lower bound of the page budget
pub const MIN_PAGES: u32 = 1;

/// Upper bound of the page budget
pub const MAX_PAGES: u32 = 20;

/// Parameters of one bounded breadth-first crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRequest {
    #[serde(default)]
    pub seed_urls: Vec<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_same_domain_only")]
    pub same_domain_only: bool,
}

/// Whether a submission path accepts an empty seed list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// At least one seed URL must be given
    Required,
    /// Zero seeds are accepted and produce an empty crawl
    Optional,
}

impl CrawlRequest {
    pub fn new<S: Into<String>>(seed_urls: impl IntoIterator<Item = S>) -> Self {
        Self {
            seed_urls: seed_urls.into_iter().map(Into::into).collect(),
            keywords: Vec::new(),
            max_pages: default_max_pages(),
            same_domain_only: default_same_domain_only(),
        }
    }

    pub fn with_keywords<S: Into<String>>(mut self, keywords: impl IntoIterator<Item = S>) -> Self {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_same_domain_only(mut self, same_domain_only: bool) -> Self {
        self.same_domain_only = same_domain_only;
        self
    }

    /// Checks bounds and URL shapes, returning the request with trimmed seed URLs
    ///
    /// # Arguments
    ///
    /// * `policy` - Whether an empty seed list is acceptable on this path
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlRequest)` - The request, ready to crawl
    /// * `Err(ValidationError)` - The first rule the request breaks
    pub fn validate(mut self, policy: SeedPolicy) -> Result<Self, ValidationError> {
        self.seed_urls = self
            .seed_urls
            .iter()
            .map(|s| s.trim().to_string())
            .collect();

        if self.seed_urls.is_empty() && policy == SeedPolicy::Required {
            return Err(ValidationError::MissingSeeds);
        }

        if self.seed_urls.len() > MAX_SEED_URLS {
            return Err(ValidationError::TooManySeeds {
                max: MAX_SEED_URLS,
                got: self.seed_urls.len(),
            });
        }

        for seed in &self.seed_urls {
            if parse_http_url(seed).is_err() {
                return Err(ValidationError::InvalidUrl { url: seed.clone() });
            }
        }

        if self.keywords.len() > MAX_KEYWORDS {
            return Err(ValidationError::TooManyKeywords {
                max: MAX_KEYWORDS,
                got: self.keywords.len(),
            });
        }

        if !(MIN_PAGES..=MAX_PAGES).contains(&self.max_pages) {
            return Err(ValidationError::PageBudget {
                min: MIN_PAGES,
                max: MAX_PAGES,
                got: self.max_pages,
            });
        }

        Ok(self)
    }

    /// Keywords as they are matched: trimmed, lowercased, blanks and repeats dropped
    pub fn normalized_keywords(&self) -> Vec<String> {
        let mut keywords: Vec<String> = Vec::with_capacity(self.keywords.len());
        for keyword in &self.keywords {
            let keyword = keyword.trim().to_lowercase();
            if !keyword.is_empty() && !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
        keywords
    }
}

fn default_max_pages() -> u32 {
    6
}

fn default_same_domain_only() -> bool {
    true
}
