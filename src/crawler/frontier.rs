use std::collections::{HashSet, VecDeque};

/// FIFO queue of URLs still to visit in one crawl
///
/// A URL is admitted at most once for the lifetime of the frontier, whether it
/// is still queued or already visited. Links discovered during the crawl are only
/// admitted while `visited + queued` is below three times the page budget; seeds
/// bypass that cap.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<String>,
    seen: HashSet<String>,
    visited: usize,
    max_pages: usize,
    growth_cap: usize,
}

impl Frontier {
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            visited: 0,
            max_pages,
            growth_cap: max_pages.saturating_mul(3),
        }
    }

    /// Adds a seed URL; returns false if it was already present
    pub fn seed(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.insert(url.clone()) {
            self.queue.push_back(url);
            true
        } else {
            false
        }
    }

    /// Offers a discovered link; returns false if it was a repeat or the frontier is full
    pub fn offer(&mut self, url: &str) -> bool {
        if self.seen.contains(url) {
            return false;
        }

        if self.visited + self.queue.len() >= self.growth_cap {
            return false;
        }

        self.seen.insert(url.to_string());
        self.queue.push_back(url.to_string());
        true
    }

    /// Takes the next URL to visit, counting it as visited
    ///
    /// Returns None once the queue is empty or the page budget is spent.
    pub fn next_url(&mut self) -> Option<String> {
        if self.visited >= self.max_pages {
            return None;
        }

        let url = self.queue.pop_front()?;
        self.visited += 1;
        Some(url)
    }

    pub fn visited(&self) -> usize {
        self.visited
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
