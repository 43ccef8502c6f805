//! Plain-text helpers for rich-text task descriptions.

const ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// Strip markup tags and decode the common entities.
///
/// Not an HTML parser: anything between `<` and the next `>` is dropped.
pub fn plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    // &amp; last so "&amp;lt;" decodes to "&lt;" and not "<"
    ENTITIES
        .iter()
        .fold(text, |acc, (entity, replacement)| acc.replace(entity, replacement))
}

/// Trim and cut `text` to `limit` characters, appending "..." when cut.
pub fn truncate_text(text: &str, limit: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<p>Hello <b>world</b></p>", "Hello world")]
    #[case("no markup", "no markup")]
    #[case("a &lt;b&gt; &amp; c", "a <b> & c")]
    #[case("&amp;lt;", "&lt;")]
    #[case("<p></p>", "")]
    #[case("it&#39;s&nbsp;&quot;fine&quot;", "it's \"fine\"")]
    fn strips_tags_and_entities(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(plain_text(html), expected);
    }

    #[rstest]
    #[case("short", 10, "short")]
    #[case("  padded  ", 10, "padded")]
    #[case("exactly ten", 11, "exactly ten")]
    #[case("a longer sentence", 8, "a longer...")]
    #[case("héllo wörld", 5, "héllo...")]
    fn truncates_on_char_boundaries(
        #[case] text: &str,
        #[case] limit: usize,
        #[case] expected: &str,
    ) {
        assert_eq!(truncate_text(text, limit), expected);
    }
}
