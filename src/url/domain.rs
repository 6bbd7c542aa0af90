use std::collections::HashSet;
use url::{Position, Url};

/// Extracts the authority (`host[:port]`) from a URL
///
/// The host is already lowercased by the URL parser. Default ports are omitted,
/// so `https://example.com:443/` and `https://example.com/` share an authority.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use shadowgraph::url::extract_authority;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(extract_authority(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_authority(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_authority(url: &Url) -> Option<String> {
    url.host_str()?;
    Some(url[Position::BeforeHost..Position::AfterPort].to_string())
}

/// Collects the authorities of a set of seed URLs
///
/// Seeds that fail to parse are skipped; request validation rejects them earlier.
pub fn seed_authorities<S: AsRef<str>>(seeds: &[S]) -> HashSet<String> {
    seeds
        .iter()
        .filter_map(|seed| Url::parse(seed.as_ref().trim()).ok())
        .filter_map(|url| extract_authority(&url))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_host() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_authority(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_keeps_explicit_port() {
        let url = Url::parse("http://localhost:3000/a/b").unwrap();
        assert_eq!(extract_authority(&url), Some("localhost:3000".to_string()));
    }

    #[test]
    fn test_extract_drops_default_port() {
        let url = Url::parse("https://example.com:443/").unwrap();
        assert_eq!(extract_authority(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_ignores_userinfo_and_query() {
        let url = Url::parse("https://user:pw@sub.example.com/p?q=1#frag").unwrap();
        assert_eq!(extract_authority(&url), Some("sub.example.com".to_string()));
    }

    #[test]
    fn test_seed_authorities_dedups() {
        let seeds = vec![
            "https://example.com/".to_string(),
            "https://example.com/other".to_string(),
            "https://blog.example.com/".to_string(),
        ];
        let hosts = seed_authorities(&seeds);
        assert_eq!(hosts.len(), 2);
        assert!(hosts.contains("example.com"));
        assert!(hosts.contains("blog.example.com"));
    }
}
