//! Hostname normalization
//!
//! Blocklist, autoblock and workflow entries are keyed by a canonical
//! hostname: lowercased, scheme stripped, a single leading `www.` removed.
//! Malformed input falls back to the lowercased/trimmed raw string so
//! callers never have to handle a normalization failure.

use url::Url;

/// Normalize a URL or bare hostname to its canonical key.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim().to_lowercase();

    let candidate = if trimmed.contains("://") {
        trimmed.clone()
    } else {
        format!("https://{}", trimmed)
    };

    match Url::parse(&candidate) {
        Ok(url) => match url.host_str() {
            Some(host) => host.strip_prefix("www.").unwrap_or(host).to_string(),
            None => trimmed,
        },
        Err(_) => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_hostname() {
        assert_eq!(normalize("example.com"), "example.com");
    }

    #[test]
    fn test_full_url_and_bare_host_agree() {
        assert_eq!(
            normalize("https://www.Example.com/path"),
            normalize("example.com")
        );
    }

    #[test]
    fn test_strips_scheme_and_www() {
        assert_eq!(normalize("http://www.youtube.com/watch?v=x"), "youtube.com");
        assert_eq!(normalize("www.youtube.com"), "youtube.com");
    }

    #[test]
    fn test_lowercases() {
        assert_eq!(normalize("FACEBOOK.COM"), "facebook.com");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(normalize("  reddit.com  "), "reddit.com");
    }

    #[test]
    fn test_keeps_subdomains() {
        assert_eq!(normalize("https://news.ycombinator.com"), "news.ycombinator.com");
    }

    #[test]
    fn test_strips_only_leading_www() {
        assert_eq!(normalize("www.www.example.com"), "www.example.com");
    }

    #[test]
    fn test_malformed_input_falls_back() {
        assert_eq!(normalize("  Not A Url  "), "not a url");
        assert_eq!(normalize(""), "");
    }
}
