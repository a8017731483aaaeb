//! Plain-text fallback bodies derived from HTML.
//!
//! The conversion is shallow and meant for the short,
//! template-generated HTML of transactional mail, not for arbitrary pages.
//! Malformed markup degrades to best-effort text and never fails.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::unwrap_used)] // literal patterns
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\b[^>]*>").unwrap());

#[allow(clippy::unwrap_used)]
static PARAGRAPH_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</p\s*>").unwrap());

#[allow(clippy::unwrap_used)]
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

#[allow(clippy::unwrap_used)]
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Converts an HTML fragment to a plain-text fallback.
///
/// Script and style blocks are removed, `<br>` and `</p>` become line
/// breaks, remaining tags are stripped, entities are decoded, and all
/// whitespace runs collapse to a single space.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = PARAGRAPH_END.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let text = decode_entities(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Decodes named and numeric character references.
///
/// Covers the full HTML5 named set, the legacy names that may omit their
/// semicolon, and the numeric remaps browsers apply (C1 codes to
/// Windows-1252, invalid code points to U+FFFD).
#[must_use]
pub fn decode_entities(text: &str) -> String {
    htmlize::unescape(text).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_simple_markup() {
        assert_eq!(html_to_text("<b>Hi</b>"), "Hi");
    }

    #[test]
    fn removes_script_and_style_blocks() {
        let html = "<STYLE type=\"text/css\">\nbody { color: red; }\n</style>\
                    <p>Visible</p><script>\nalert('x');\n</SCRIPT >text";
        assert_eq!(html_to_text(html), "Visible text");
    }

    #[test]
    fn line_breaks_and_paragraphs_collapse_to_spaces() {
        let html = "<p>Best regards,<br>The Team</p><p>Next<BR/>line<br class=\"x\" /></p>";
        assert_eq!(html_to_text(html), "Best regards, The Team Next line");
    }

    #[test]
    fn decodes_entities_after_stripping_tags() {
        assert_eq!(html_to_text("Fish &amp; Chips"), "Fish & Chips");
        assert_eq!(html_to_text("&lt;b&gt;literal&lt;/b&gt;"), "<b>literal</b>");
        assert_eq!(html_to_text("&#36;49.99 &#x20AC;5"), "$49.99 €5");
        assert_eq!(html_to_text("a&nbsp;&nbsp;b"), "a b");
    }

    #[test]
    fn decodes_the_full_named_set() {
        assert_eq!(html_to_text("&rarr; next"), "\u{2192} next");
        assert_eq!(html_to_text("&hearts;"), "\u{2665}");
        assert_eq!(html_to_text("&Oslash;rsted"), "\u{D8}rsted");
    }

    #[test]
    fn legacy_entities_without_semicolon() {
        assert_eq!(html_to_text("&copy 2025"), "\u{A9} 2025");
        assert_eq!(html_to_text("Fish &amp Chips"), "Fish & Chips");
    }

    #[test]
    fn numeric_references_follow_browser_rules() {
        assert_eq!(html_to_text("&#x80;"), "\u{20AC}");
        assert_eq!(html_to_text("&#xFFFFFF;"), "\u{FFFD}");
    }

    #[test]
    fn unknown_entities_are_kept() {
        assert_eq!(html_to_text("&bogus; and &zz;"), "&bogus; and &zz;");
    }

    #[test]
    fn malformed_markup_is_best_effort() {
        assert_eq!(html_to_text("<p>Unclosed <b>bold"), "Unclosed bold");
        assert_eq!(html_to_text("1 < 2 and 3 > 2"), "1 2");
        assert_eq!(html_to_text("<script>never closed"), "never closed");
    }

    #[test]
    fn welcome_like_document() {
        let html = r"
            <html><body>
            <h2>Welcome, Jane!</h2>
            <p>Your registration was successful.</p>
            <p>Best regards,<br>The Team</p>
            </body></html>
        ";
        assert_eq!(
            html_to_text(html),
            "Welcome, Jane! Your registration was successful. Best regards, The Team"
        );
    }

    proptest! {
        #[test]
        fn script_contents_never_leak(
            before in "[a-z ]{0,20}",
            secret in "[A-Z0-9]{8,16}",
            after in "[a-z ]{0,20}",
        ) {
            let html = format!("{before}<script type=\"text/javascript\">\nvar s = '{secret}';\n</script>{after}<style>.x{{}} {secret}</style>");
            let text = html_to_text(&html);
            prop_assert!(!text.contains(&secret));
        }

        #[test]
        fn idempotent_on_plain_text(text in "[a-zA-Z0-9 .,!?:;'\"()\\-\n\t]{0,80}") {
            let once = html_to_text(&text);
            prop_assert_eq!(html_to_text(&once), once.clone());
        }

        #[test]
        fn output_has_no_whitespace_runs(html in "[a-z <>/&;\n\t]{0,80}") {
            let text = html_to_text(&html);
            prop_assert!(!text.contains("  "));
            prop_assert_eq!(text.trim(), text.as_str());
        }
    }
}
