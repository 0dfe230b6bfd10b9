//! HTML stripping for description fields (spec §4.4 "HTML-stripped description").

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub fn strip_html(input: &str) -> String {
    let no_tags = TAG_RE.replace_all(input, " ");
    let decoded = no_tags
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#39;", "'")
        .replace("&quot;", "\"");
    WHITESPACE_RE.replace_all(decoded.trim(), " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let input = "<p>14K   Gold</p><br/>5.5g &amp; nice";
        assert_eq!(strip_html(input), "14K Gold 5.5g & nice");
    }
}
