//! HTML rendering of a content tree.
//!
//! Produces the `content_html` fragment the page template wraps. Keeps to
//! the handful of constructs the pipeline emits; anything structural just
//! recurses into its children.

use super::tree::{ContentNode, Mark, NodeKind, RichTextSegment};

/// Render a page's content tree to an HTML fragment.
pub fn render_tree(root: &ContentNode) -> String {
    let mut out = String::new();
    for child in &root.children {
        render_node(child, &mut out);
    }
    out
}

fn render_node(node: &ContentNode, out: &mut String) {
    match &node.kind {
        NodeKind::Text { title } => {
            out.push_str("<p>");
            render_segments(title, out);
            out.push_str("</p>\n");
        }
        NodeKind::Image { source } => {
            out.push_str(&format!(
                "<figure id=\"{}\"><img loading=\"lazy\" decoding=\"async\" src=\"{}\"></figure>\n",
                escape(&node.id),
                escape(source)
            ));
        }
        NodeKind::PageReference { target } => {
            out.push_str(&format!(
                "<p class=\"page-ref\"><a href=\"{}\">{}</a></p>\n",
                escape(target),
                escape(target)
            ));
        }
        NodeKind::Container => {}
    }

    if !node.children.is_empty() {
        out.push_str("<div class=\"children\">\n");
        for child in &node.children {
            render_node(child, out);
        }
        out.push_str("</div>\n");
    }
}

fn render_segments(segments: &[RichTextSegment], out: &mut String) {
    for segment in segments {
        let mut html = escape(&segment.text);
        for mark in &segment.marks {
            html = match mark {
                Mark::Bold => format!("<strong>{html}</strong>"),
                Mark::Italic => format!("<em>{html}</em>"),
                Mark::Strikethrough => format!("<del>{html}</del>"),
                Mark::Code => format!("<code>{html}</code>"),
                Mark::Link { target } => {
                    format!("<a href=\"{}\">{html}</a>", escape(target))
                }
                Mark::PageMention { uri } => {
                    // Mention segments carry a placeholder glyph; show the
                    // target instead.
                    format!("<a href=\"{}\">{}</a>", escape(uri), escape(uri))
                }
            };
        }
        out.push_str(&html);
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
