//! Source links appended to answers

use reqwest::Url;

/// The source as a citable link, if it is an absolute web URL
///
/// Local paths and other schemes are never shown to the user.
pub fn web_source(source: &str) -> Option<String> {
    let url = Url::parse(source.trim()).ok()?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => {
            Some(source.trim().to_string())
        }
        _ => None,
    }
}

/// Answer text with the citation line appended
pub fn with_citation(answer: &str, url: &str) -> String {
    format!("{}\nSource: {}", answer, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_urls_are_cited() {
        assert_eq!(
            web_source("https://docs.example.com/policy.pdf").as_deref(),
            Some("https://docs.example.com/policy.pdf")
        );
        assert!(web_source("http://intranet/handbook.pdf").is_some());
    }

    #[test]
    fn test_local_and_other_sources_are_not() {
        assert!(web_source("/tmp/x.pdf").is_none());
        assert!(web_source("C:\\docs\\x.pdf").is_none());
        assert!(web_source("file:///tmp/x.pdf").is_none());
        assert!(web_source("ftp://example.com/x.pdf").is_none());
        assert!(web_source("x.pdf").is_none());
        assert!(web_source("").is_none());
    }

    #[test]
    fn test_with_citation() {
        assert_eq!(
            with_citation("Five days.", "https://x.io/a.pdf"),
            "Five days.\nSource: https://x.io/a.pdf"
        );
    }
}
