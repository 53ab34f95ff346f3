//! Markdown body renderer using pulldown-cmark.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd, html};

use crate::{RenderFn, render_fn};

/// Markdown renderer producing HTML with anchor ids on headings.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Create a new markdown renderer with default options.
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Render a markdown body to HTML.
    pub fn render(&self, body: &str) -> String {
        let mut events: Vec<Event<'_>> = Parser::new_ext(body, self.options).collect();
        assign_heading_ids(&mut events);

        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }

    /// Wrap this renderer as a body render function.
    pub fn into_render_fn(self) -> RenderFn {
        render_fn(move |body| Ok(self.render(body)))
    }
}

/// Give every heading without an explicit `{#id}` a slug of its text.
fn assign_heading_ids(events: &mut [Event<'_>]) {
    let mut i = 0;
    while i < events.len() {
        if let Event::Start(Tag::Heading { id: None, .. }) = &events[i] {
            let mut text = String::new();
            for event in &events[i + 1..] {
                match event {
                    Event::End(TagEnd::Heading(_)) => break,
                    Event::Text(t) | Event::Code(t) => text.push_str(t),
                    _ => {}
                }
            }
            let slug = slugify(&text);
            if !slug.is_empty()
                && let Event::Start(Tag::Heading { id, .. }) = &mut events[i]
            {
                *id = Some(CowStr::from(slug));
            }
        }
        i += 1;
    }
}

/// Convert text to a URL-safe slug.
fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple_markdown() {
        let html = MarkdownRenderer::new().render("# Hello World\n\nThis is a test.");

        assert!(html.contains("<h1 id=\"hello-world\">Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_explicit_heading_id_is_kept() {
        let html = MarkdownRenderer::new().render("## Setup {#install}");
        assert!(html.contains("<h2 id=\"install\">Setup</h2>"));
    }

    #[test]
    fn test_html_comment_passes_through() {
        let html = MarkdownRenderer::new().render("Intro\n\n<!-- more -->\n\nRest");
        assert!(html.contains("<!-- more -->"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Test 123 Post"), "test-123-post");
        assert_eq!(slugify("Multiple   Spaces"), "multiple-spaces");
        assert_eq!(slugify("Special!@#Chars"), "specialchars");
    }

    #[test]
    fn test_table_rendering() {
        let html = MarkdownRenderer::new().render(
            r#"| Header 1 | Header 2 |
|----------|----------|
| Cell 1   | Cell 2   |"#,
        );

        assert!(html.contains("<table>"));
        assert!(html.contains("<thead>"));
        assert!(html.contains("<td>"));
    }

    #[test]
    fn test_task_list() {
        let html = MarkdownRenderer::new().render("- [x] Done\n- [ ] Not done");

        assert!(html.contains("checkbox"));
        assert!(html.contains("checked"));
    }

    #[test]
    fn test_render_fn() {
        let render = MarkdownRenderer::new().into_render_fn();
        let html = render("*hi*").expect("render");
        assert_eq!(html.trim(), "<p><em>hi</em></p>");
    }
}
