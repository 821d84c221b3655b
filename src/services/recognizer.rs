// src/services/recognizer.rs

//! Source recognition: does a URL belong to a managed provider?

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ManagedSource, Provider, SourceId};

static YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(youtu\.be|youtube\.com|youtube-nocookie\.com)/(embed/|watch\?v=)?([^?&]+)")
        .expect("YouTube pattern is valid")
});

static VIMEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(vimeo\.com)/(video/)?([0-9]+)").expect("Vimeo pattern is valid")
});

static BUZZSPROUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(buzzsprout\.com)/([0-9]+)\.js").expect("Buzzsprout pattern is valid")
});

static ORBITA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(orbita\.(cloud|com))(.*)/chatbot/").expect("Orbita pattern is valid")
});

/// Recognize a managed source.
///
/// Patterns are tried in a fixed order (YouTube, Vimeo, Buzzsprout,
/// Orbita) and the first match wins. `None` means the URL is an ordinary,
/// unmanaged resource.
pub fn recognize(url: &str) -> Option<ManagedSource> {
    if let Some(caps) = YOUTUBE.captures(url) {
        if let Some(id) = caps.get(3) {
            return source(&caps[1], SourceId::Video(id.as_str().to_string()));
        }
    }

    if let Some(caps) = VIMEO.captures(url) {
        return source(&caps[1], SourceId::Video(caps[3].to_string()));
    }

    if let Some(caps) = BUZZSPROUT.captures(url) {
        return source(&caps[1], SourceId::Subscription(caps[2].to_string()));
    }

    if let Some(caps) = ORBITA.captures(url) {
        return source(&caps[1], SourceId::None);
    }

    None
}

fn source(domain: &str, id: SourceId) -> Option<ManagedSource> {
    let provider = Provider::from_domain(domain)?;
    Some(ManagedSource {
        provider,
        domain: domain.to_string(),
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(url: &str) -> Option<(Provider, String)> {
        recognize(url).and_then(|s| s.video_id().map(|id| (s.provider, id.to_string())))
    }

    #[test]
    fn test_youtube_formats() {
        let expected = Some((Provider::YouTube, "abc123".to_string()));
        assert_eq!(video("https://youtu.be/abc123?t=5"), expected);
        assert_eq!(video("https://www.youtube.com/watch?v=abc123&t=5"), expected);
        assert_eq!(video("https://www.youtube.com/embed/abc123"), expected);
        assert_eq!(video("https://www.youtube-nocookie.com/embed/abc123?rel=0"), expected);
    }

    #[test]
    fn test_youtube_keeps_domain() {
        let source = recognize("https://youtu.be/abc123?t=5").unwrap();
        assert_eq!(source.domain, "youtu.be");
        assert_eq!(source.id, SourceId::Video("abc123".into()));
    }

    #[test]
    fn test_vimeo_formats() {
        let expected = Some((Provider::Vimeo, "987654".to_string()));
        assert_eq!(video("https://vimeo.com/video/987654"), expected);
        assert_eq!(video("https://player.vimeo.com/video/987654?h=ff"), expected);
        assert_eq!(video("https://vimeo.com/987654"), expected);
        assert_eq!(video("https://vimeo.com/channels/staffpicks"), None);
    }

    #[test]
    fn test_buzzsprout_script() {
        let source = recognize(
            "https://www.buzzsprout.com/1324951.js?container_id=buzzsprout-large-player&player=large",
        )
        .unwrap();
        assert_eq!(source.provider, Provider::Buzzsprout);
        assert_eq!(source.subscription_id(), Some("1324951"));
        assert_eq!(source.video_id(), None);
    }

    #[test]
    fn test_orbita_script() {
        let source =
            recognize("https://otsuka-jynarque-stage.orbita.cloud:8443/chatbot/v3/chat.js").unwrap();
        assert_eq!(source.provider, Provider::Orbita);
        assert_eq!(source.domain, "orbita.cloud");
        assert_eq!(source.id, SourceId::None);

        let source = recognize("https://bots.orbita.com/chatbot/chat.js").unwrap();
        assert_eq!(source.domain, "orbita.com");
    }

    #[test]
    fn test_unmanaged_urls() {
        assert!(recognize("https://example.com/video.mp4").is_none());
        assert!(recognize("https://cdn.example.com/app.js").is_none());
        assert!(recognize("https://www.buzzsprout.com/episodes").is_none());
        assert!(recognize("https://orbita.cloud/assets/app.js").is_none());
        assert!(recognize("").is_none());
    }
}
