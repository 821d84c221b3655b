// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Checks if the URL contains a query string.
pub fn has_query_string(url: &str) -> bool {
    url.contains('?')
}

/// Append a raw `key=value` parameter, choosing `?` or `&` as needed.
///
/// # Examples
/// ```
/// use media_consent::utils::url::append_param;
///
/// assert_eq!(append_param("https://vimeo.com/1", "dnt=1"), "https://vimeo.com/1?dnt=1");
/// assert_eq!(append_param("https://vimeo.com/1?a=b", "dnt=1"), "https://vimeo.com/1?a=b&dnt=1");
/// ```
pub fn append_param(url: &str, param: &str) -> String {
    let separator = if has_query_string(url) { '&' } else { '?' };
    format!("{url}{separator}{param}")
}

/// Read a query parameter from an absolute URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_param() {
        assert_eq!(
            append_param("https://www.youtube.com/embed/abc", "enablejsapi=1"),
            "https://www.youtube.com/embed/abc?enablejsapi=1"
        );
        assert_eq!(
            append_param("https://www.youtube.com/embed/abc?rel=0", "enablejsapi=1"),
            "https://www.youtube.com/embed/abc?rel=0&enablejsapi=1"
        );
    }

    #[test]
    fn test_query_param() {
        let src = "https://www.buzzsprout.com/1324951.js?container_id=buzzsprout-large-player&player=large";
        assert_eq!(
            query_param(src, "container_id"),
            Some("buzzsprout-large-player".to_string())
        );
        assert_eq!(query_param(src, "missing"), None);
        assert_eq!(query_param("not a url", "container_id"), None);
    }
}
