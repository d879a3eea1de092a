//! Live preview extraction for code mode.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

const PREVIEW_LANGUAGES: [&str; 2] = ["html", "svg"];

/// Body of the last fenced block tagged `html` or `svg`, if any.
pub fn extract_preview(markdown: &str) -> Option<String> {
    let mut last = None;
    let mut current: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                if is_preview_language(&info) {
                    current = Some(String::new());
                }
            }
            Event::Text(text) => {
                if let Some(body) = current.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(body) = current.take() {
                    last = Some(body.trim_end_matches('\n').to_string());
                }
            }
            _ => {}
        }
    }

    last
}

fn is_preview_language(info: &str) -> bool {
    let language = info.split_whitespace().next().unwrap_or_default();
    PREVIEW_LANGUAGES
        .iter()
        .any(|candidate| language.eq_ignore_ascii_case(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_html_block_wins() {
        let response = "First:\n\n```html\n<p>one</p>\n```\n\nThen:\n\n```html\n<p>two</p>\n```\n";
        assert_eq!(extract_preview(response).as_deref(), Some("<p>two</p>"));
    }

    #[test]
    fn svg_blocks_count_and_other_languages_do_not() {
        let response = "```svg\n<svg></svg>\n```\n\n```rust\nfn main() {}\n```\n";
        assert_eq!(extract_preview(response).as_deref(), Some("<svg></svg>"));
    }

    #[test]
    fn no_tagged_block_means_no_preview() {
        assert_eq!(extract_preview("plain `html` text\n\n```\n<b>x</b>\n```"), None);
        assert_eq!(extract_preview(""), None);
    }

    #[test]
    fn fence_tags_match_in_any_case() {
        let response = "```Svg width=10\n<svg/>\n```\n\n```HTMLX\n<p/>\n```\n";
        assert_eq!(extract_preview(response).as_deref(), Some("<svg/>"));
    }

    #[test]
    fn multiline_body_is_kept_intact() {
        let response = "```HTML\n<div>\n  <span>hi</span>\n</div>\n```";
        assert_eq!(
            extract_preview(response).as_deref(),
            Some("<div>\n  <span>hi</span>\n</div>")
        );
    }
}
