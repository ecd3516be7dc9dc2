//! Free-text cleanup for legacy content fields: shortcode stripping,
//! editor block-comment removal, entity decoding, whitespace collapsing.
//! Re-applying to already-cleaned text is a no-op.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static GALLERY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[gallery[^\]]*\]").unwrap());

static CAPTION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[caption[^\]]*\].*?\[/caption\]").unwrap());

static EMBED_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[embed[^\]]*\].*?\[/embed\]").unwrap());

/// Unpaired openers/closers left behind by truncated legacy content.
static STRAY_SHORTCODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[/?(?:gallery|caption|embed)[^\]]*\]").unwrap());

/// Block-editor comment markers, e.g. `<!-- wp:paragraph -->` and
/// `<!-- /wp:paragraph -->`.
static BLOCK_COMMENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--\s*/?wp:.*?-->").unwrap());

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:lt|gt|quot|amp|nbsp|#0?39|#8211|#8212|#8216|#8217|#8220|#8221|#8230|#038);")
        .unwrap()
});

static BLANK_RUN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());

/// Cleans one free-text field. Rules apply in sequence: shortcodes, block
/// comment markers, the fixed entity table, blank-line collapsing, trim.
pub fn normalize(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");

    let text = CAPTION_REGEX.replace_all(&text, "");
    let text = EMBED_REGEX.replace_all(&text, "");
    let text = GALLERY_REGEX.replace_all(&text, "");
    let text = STRAY_SHORTCODE_REGEX.replace_all(&text, "");
    let text = BLOCK_COMMENT_REGEX.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = BLANK_RUN_REGEX.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Decodes the fixed entity table in one left-to-right pass.
pub fn decode_entities(text: &str) -> String {
    ENTITY_REGEX
        .replace_all(text, |caps: &Captures| entity_replacement(&caps[0]).to_string())
        .into_owned()
}

fn entity_replacement(entity: &str) -> &str {
    match entity {
        "&lt;" => "<",
        "&gt;" => ">",
        "&quot;" => "\"",
        "&#39;" | "&#039;" => "'",
        "&nbsp;" => " ",
        "&#8211;" => "\u{2013}",
        "&#8212;" => "\u{2014}",
        "&#8216;" => "\u{2018}",
        "&#8217;" => "\u{2019}",
        "&#8220;" => "\u{201C}",
        "&#8221;" => "\u{201D}",
        "&#8230;" => "\u{2026}",
        "&amp;" | "&#038;" => "&",
        other => other,
    }
}

/// Derives a URL-safe key from a display name: lowercased, with runs of
/// non-alphanumeric characters folded to single dashes.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lc in c.to_lowercase() {
                slug.push(lc);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gallery_shortcode_removed() {
        assert_eq!(normalize("before [gallery ids=\"1,2\"] after"), "before  after");
    }

    #[test]
    fn caption_block_removed_with_content() {
        let text = "intro [caption id=\"a\"]<img src=\"x.jpg\"> A caption[/caption] outro";
        assert_eq!(normalize(text), "intro  outro");
    }

    #[test]
    fn embed_block_removed() {
        let text = "see [embed width=\"500\"]https://example.com/v[/embed] here";
        assert_eq!(normalize(text), "see  here");
    }

    #[test]
    fn stray_closer_removed() {
        assert_eq!(normalize("text [/caption] more"), "text  more");
    }

    #[test]
    fn block_comments_removed() {
        let text = "<!-- wp:paragraph -->\n<p>Hello</p>\n<!-- /wp:paragraph -->";
        assert_eq!(normalize(text), "<p>Hello</p>");
    }

    #[test]
    fn entities_decoded() {
        assert_eq!(normalize("a &lt;b&gt; &quot;c&quot; &amp; d"), "a <b> \"c\" & d");
        assert_eq!(normalize("it&#8217;s &#8211; fine&#8230;"), "it\u{2019}s \u{2013} fine\u{2026}");
    }

    #[test]
    fn unknown_entities_untouched() {
        assert_eq!(normalize("&copy; &#9731;"), "&copy; &#9731;");
    }

    #[test]
    fn blank_runs_collapsed() {
        assert_eq!(normalize("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize("a\n \t\n   \nb"), "a\n\nb");
    }

    #[test]
    fn single_blank_line_kept() {
        assert_eq!(normalize("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn crlf_normalized() {
        assert_eq!(normalize("a\r\n\r\n\r\nb"), "a\n\nb");
    }

    #[test]
    fn trims_ends() {
        assert_eq!(normalize("  \n body \n  "), "body");
    }

    #[test]
    fn idempotent_on_realistic_content() {
        let inputs = [
            "<p>Hello &amp; welcome</p>",
            "[gallery]\n\n\nText with &lt;tags&gt; and it&#8217;s quotes",
            "<!-- wp:heading --><h2>Title</h2><!-- /wp:heading -->\n\n\n\nBody",
            "plain text, nothing to do",
            "",
        ];
        for x in inputs {
            let once = normalize(x);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", x);
        }
    }

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Already--dashed  "), "already-dashed");
        assert_eq!(slugify("Ünïcode Näme"), "ünïcode-näme");
    }

    #[test]
    fn slugify_empty_and_symbols() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify("a & b"), "a-b");
    }
}
