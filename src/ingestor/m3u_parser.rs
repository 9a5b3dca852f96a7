//! Extended-M3U playlist parser
//!
//! Turns raw playlist text into an ordered list of [`Candidate`]s. An
//! `#EXTINF:` line opens a metadata context; the next non-comment,
//! non-empty line closes it and becomes the stream URL if it is an HTTP(S)
//! URL. Anything else is dropped silently, so malformed input simply yields
//! fewer (or no) candidates.

use std::collections::HashMap;

use tracing::debug;

use crate::models::Candidate;
use crate::utils::url::UrlUtils;

const EXTINF_PREFIX: &str = "#EXTINF:";
const UNKNOWN_CHANNEL_NAME: &str = "Unknown";

/// Metadata carried by an `#EXTINF:` line until its URL line arrives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ExtinfMetadata {
    channel_name: String,
    group: String,
    logo: String,
}

/// Parse playlist text from `source` into candidates, in playlist order.
///
/// The returned candidates carry an empty `source_label`.
pub fn parse_m3u(content: &str, source: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut current: Option<ExtinfMetadata> = None;
    let mut discarded = 0usize;

    for line in content.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(EXTINF_PREFIX) {
            current = Some(parse_extinf_line(line));
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let Some(metadata) = current.take() else {
            continue;
        };

        if UrlUtils::is_http_url(line) {
            candidates.push(Candidate {
                logo: metadata.logo,
                group: metadata.group,
                channel_name: metadata.channel_name,
                url: line.to_string(),
                source: source.to_string(),
                source_label: String::new(),
            });
        } else {
            discarded += 1;
        }
    }

    debug!(
        "Parsed {} candidates ({} non-HTTP entries discarded)",
        candidates.len(),
        discarded
    );
    candidates
}

/// Split an `#EXTINF:` line into display name and attributes.
///
/// The display name is whatever follows the last comma.
fn parse_extinf_line(line: &str) -> ExtinfMetadata {
    let body = line.strip_prefix(EXTINF_PREFIX).unwrap_or(line);

    let (attributes_part, channel_name) = match body.rfind(',') {
        Some(comma_pos) => (&body[..comma_pos], body[comma_pos + 1..].trim()),
        None => (body, UNKNOWN_CHANNEL_NAME),
    };

    let mut attributes = parse_extinf_attributes(attributes_part);

    ExtinfMetadata {
        channel_name: channel_name.to_string(),
        group: attributes.remove("group-title").unwrap_or_default(),
        logo: attributes.remove("tvg-logo").unwrap_or_default(),
    }
}

/// Parse `key="value"` fragments from the attribute part of an EXTINF line
fn parse_extinf_attributes(attrs_part: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();

    let mut chars = attrs_part.chars().peekable();
    let mut current_key = String::new();
    let mut current_value = String::new();
    let mut in_quotes = false;
    let mut in_key = false;
    let mut in_value = false;

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' if !in_quotes => {
                if in_value && !current_key.is_empty() && !current_value.is_empty() {
                    attributes.insert(current_key.clone(), current_value.clone());
                }
                current_key.clear();
                current_value.clear();
                in_value = false;
                in_key = true;
            }
            '=' if !in_quotes && !in_value => {
                in_key = false;
                in_value = true;
                if chars.peek() == Some(&'"') {
                    chars.next();
                    in_quotes = true;
                }
            }
            '"' if in_value => {
                in_quotes = false;
                if !current_key.is_empty() {
                    attributes.insert(current_key.clone(), current_value.clone());
                }
                current_key.clear();
                current_value.clear();
                in_value = false;
            }
            _ => {
                if in_key {
                    current_key.push(ch);
                } else if in_value {
                    current_value.push(ch);
                }
            }
        }
    }

    // Trailing unquoted value
    if in_value && !current_key.is_empty() && !current_value.is_empty() {
        attributes.insert(current_key, current_value);
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const SOURCE: &str = "http://a.test/list.m3u";

    #[test]
    fn test_parse_basic_playlist() {
        let content = r#"#EXTM3U
#EXTINF:-1 tvg-logo="http://img.test/one.png" group-title="News",Channel One
http://x.com/1
#EXTINF:-1 group-title="Sports",Channel Two
https://x.com/2
"#;
        let candidates = parse_m3u(content, SOURCE);
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].channel_name, "Channel One");
        assert_eq!(candidates[0].logo, "http://img.test/one.png");
        assert_eq!(candidates[0].group, "News");
        assert_eq!(candidates[0].url, "http://x.com/1");
        assert_eq!(candidates[0].source, SOURCE);
        assert!(candidates[0].source_label.is_empty());

        assert_eq!(candidates[1].channel_name, "Channel Two");
        assert_eq!(candidates[1].logo, "");
        assert_eq!(candidates[1].group, "Sports");
    }

    #[test]
    fn test_comments_between_metadata_and_url_are_skipped() {
        let content = "#EXTINF:-1,Channel\n#EXTVLCOPT:http-user-agent=VLC\n\n  http://x.com/1  \n";
        let candidates = parse_m3u(content, SOURCE);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "http://x.com/1");
    }

    #[test]
    fn test_non_http_url_discards_metadata() {
        let content = "#EXTINF:-1,Multicast\nudp://@239.0.0.1:1234\nhttp://x.com/orphan\n";
        assert!(parse_m3u(content, SOURCE).is_empty());
    }

    #[test]
    fn test_url_without_metadata_is_ignored() {
        let content = "#EXTM3U\nhttp://x.com/1\n#EXTINF:-1,Kept\nhttp://x.com/2\n";
        let candidates = parse_m3u(content, SOURCE);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].channel_name, "Kept");
    }

    #[test]
    fn test_latest_metadata_wins() {
        let content = "#EXTINF:-1,First\n#EXTINF:-1,Second\nhttp://x.com/1\n";
        let candidates = parse_m3u(content, SOURCE);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].channel_name, "Second");
    }

    #[test]
    fn test_metadata_at_end_of_file_is_dropped() {
        let content = "#EXTINF:-1,Channel\nhttp://x.com/1\n#EXTINF:-1,Dangling\n";
        assert_eq!(parse_m3u(content, SOURCE).len(), 1);
    }

    #[rstest]
    #[case("")]
    #[case("\n\n\n")]
    #[case("not a playlist at all")]
    #[case("#EXTM3U\n#EXTINF:-1,No url")]
    fn test_empty_or_malformed_input(#[case] content: &str) {
        assert!(parse_m3u(content, SOURCE).is_empty());
    }

    #[rstest]
    #[case("#EXTINF:-1 tvg-id=\"one\",Channel One", "Channel One")]
    #[case("#EXTINF:-1 group-title=\"A, B\",Name", "Name")]
    #[case("#EXTINF:-1,News, Weather", "Weather")]
    #[case("#EXTINF:-1 tvg-id=\"x\"", "Unknown")]
    fn test_display_name_follows_last_comma(#[case] line: &str, #[case] expected: &str) {
        assert_eq!(parse_extinf_line(line).channel_name, expected);
    }

    #[test]
    fn test_quoted_attribute_with_comma() {
        let metadata =
            parse_extinf_line(r#"#EXTINF:-1 tvg-logo="http://img.test/a.png" group-title="A, B",Name"#);
        assert_eq!(metadata.group, "A, B");
        assert_eq!(metadata.logo, "http://img.test/a.png");
    }

    #[test]
    fn test_parse_extinf_attributes() {
        let attrs = parse_extinf_attributes(
            r#"-1 tvg-id="id1" tvg-name="Name With Spaces" tvg-logo="logo.png" group-title="Group""#,
        );
        assert_eq!(attrs.get("tvg-id"), Some(&"id1".to_string()));
        assert_eq!(attrs.get("tvg-name"), Some(&"Name With Spaces".to_string()));
        assert_eq!(attrs.get("tvg-logo"), Some(&"logo.png".to_string()));
        assert_eq!(attrs.get("group-title"), Some(&"Group".to_string()));
    }
}
