use regex::Regex;

/// Extract the lyrics text from a Genius song page.
///
/// Genius renders lyrics in one or more `<div data-lyrics-container="true">`
/// blocks with `<br>` line breaks and inline markup (section links,
/// annotations). Returns `None` when the page has no recognizable lyrics.
pub fn extract_lyrics(html: &str) -> Option<String> {
    let container =
        Regex::new(r#"(?s)<div[^>]*data-lyrics-container="true"[^>]*>(.*?)</div>"#).unwrap();

    let mut blocks = Vec::new();
    for captures in container.captures_iter(html) {
        let text = clean_block(&captures[1]);
        if !text.trim().is_empty() {
            blocks.push(text.trim().to_string());
        }
    }

    if blocks.is_empty() {
        return None;
    }

    Some(blocks.join("\n\n"))
}

fn clean_block(block: &str) -> String {
    // <br> variants become newlines before the remaining tags are stripped
    let br = Regex::new(r"(?i)<br\s*/?>").unwrap();
    let with_newlines = br.replace_all(block, "\n");

    let tag = Regex::new(r"<[^>]+>").unwrap();
    let stripped = tag.replace_all(&with_newlines, "");

    decode_entities(&stripped)
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_container() {
        let html = r#"<html><body>
            <div data-lyrics-container="true">First line<br/>Second line</div>
        </body></html>"#;

        let lyrics = extract_lyrics(html).unwrap();
        assert_eq!(lyrics, "First line\nSecond line");
    }

    #[test]
    fn test_extract_strips_inline_markup() {
        let html = r#"<div data-lyrics-container="true">[Verse 1]<br>
<a href="/123"><span>Is this the real life?</span></a><br>
Is this just fantasy?</div>"#;

        let lyrics = extract_lyrics(html).unwrap();
        assert!(lyrics.contains("[Verse 1]"));
        assert!(lyrics.contains("Is this the real life?"));
        assert!(lyrics.contains("Is this just fantasy?"));
        assert!(!lyrics.contains("<a"));
        assert!(!lyrics.contains("<span"));
    }

    #[test]
    fn test_extract_joins_multiple_containers() {
        let html = r#"
            <div data-lyrics-container="true" class="Lyrics__Container">Part one</div>
            <div class="other">not lyrics</div>
            <div data-lyrics-container="true">Part two</div>
        "#;

        let lyrics = extract_lyrics(html).unwrap();
        assert_eq!(lyrics, "Part one\n\nPart two");
    }

    #[test]
    fn test_extract_decodes_entities() {
        let html = r#"<div data-lyrics-container="true">Simon &amp; Garfunkel&#x27;s song &quot;quoted&quot;</div>"#;

        let lyrics = extract_lyrics(html).unwrap();
        assert_eq!(lyrics, "Simon & Garfunkel's song \"quoted\"");
    }

    #[test]
    fn test_extract_none_without_container() {
        let html = "<html><body><p>Page not found</p></body></html>";
        assert!(extract_lyrics(html).is_none());
    }

    #[test]
    fn test_extract_none_for_empty_container() {
        let html = r#"<div data-lyrics-container="true">  <span></span>  </div>"#;
        assert!(extract_lyrics(html).is_none());
    }
}
