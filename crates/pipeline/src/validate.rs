//! Inbound text validation: only recognized media-host URLs enter the
//! pipeline, so no artifact is ever allocated for plain chatter.

use url::Url;

/// Hosts the relay accepts media links from.
const RECOGNIZED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Extract a recognized media URL from inbound text.
///
/// Returns `None` when the text is not an http(s) link to a recognized
/// host; the caller treats that as user error, not a fetch failure.
#[must_use]
pub fn recognized_url(text: &str) -> Option<Url> {
    let parsed = Url::parse(text.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    let host = parsed.host_str()?;
    RECOGNIZED_HOSTS
        .iter()
        .any(|recognized| host.eq_ignore_ascii_case(recognized))
        .then_some(parsed)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("https://youtu.be/abc123")]
    #[case("https://www.youtube.com/watch?v=dQw4w9WgXcQ")]
    #[case("http://m.youtube.com/watch?v=x")]
    #[case("  https://youtube.com/shorts/abc  ")]
    #[case("https://YOUTU.BE/abc")]
    fn accepts_recognized_hosts(#[case] text: &str) {
        assert!(recognized_url(text).is_some(), "should accept {text:?}");
    }

    #[rstest]
    #[case("hello")]
    #[case("")]
    #[case("https://example.com/watch?v=abc")]
    #[case("https://notyoutu.be/abc")]
    #[case("https://youtube.com.evil.example/watch")]
    #[case("ftp://youtu.be/abc")]
    #[case("watch this: https://youtu.be/abc")]
    fn rejects_everything_else(#[case] text: &str) {
        assert!(recognized_url(text).is_none(), "should reject {text:?}");
    }
}
