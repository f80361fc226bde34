use comrak::nodes::{AstNode, NodeValue};
use comrak::{Arena, Options, parse_document};
use std::collections::BTreeMap;

use super::links::classify_reference;
use super::{
    Element, ElementKind, ElementTree, LinkReference, StructuralParser, slice_on_boundaries,
};

/// Byte offset of every line start, for comrak's 1-based line/column positions.
struct LineIndex {
    starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        Self {
            starts,
            len: text.len(),
        }
    }

    fn start_offset(&self, line: usize, column: usize) -> Option<usize> {
        if line == 0 || column == 0 {
            return None;
        }
        let start = *self.starts.get(line - 1)?;
        Some((start + column - 1).min(self.len))
    }

    /// Exclusive end offset for an inclusive end position.
    fn end_offset(&self, line: usize, column: usize) -> Option<usize> {
        if line == 0 {
            return None;
        }
        let start = *self.starts.get(line - 1)?;
        Some((start + column).min(self.len))
    }

    fn span(&self, start: (usize, usize), end: (usize, usize)) -> Option<(usize, usize)> {
        let begin = self.start_offset(start.0, start.1)?;
        let end = self.end_offset(end.0, end.1)?;
        Some((begin, end.max(begin)))
    }
}

fn describe(value: &NodeValue) -> (ElementKind, Option<LinkReference>, BTreeMap<String, String>) {
    let mut properties = BTreeMap::new();
    let (kind, link) = match value {
        NodeValue::Document => (ElementKind::Document, None),
        NodeValue::Paragraph => (ElementKind::Paragraph, None),
        NodeValue::Heading(_) => (ElementKind::Heading, None),
        NodeValue::Item(_) => (ElementKind::ListItem, None),
        NodeValue::BlockQuote => (ElementKind::Quote, None),
        NodeValue::TableCell => (ElementKind::TableCell, None),
        NodeValue::Link(link) => {
            properties.insert("url".to_string(), link.url.to_string());
            if !link.title.is_empty() {
                properties.insert("title".to_string(), link.title.to_string());
            }
            (ElementKind::Link, Some(classify_reference(&link.url, false)))
        }
        NodeValue::WikiLink(link) => {
            properties.insert("url".to_string(), link.url.to_string());
            (ElementKind::Link, Some(classify_reference(&link.url, true)))
        }
        other if other.block() => (ElementKind::Container, None),
        _ => (ElementKind::Inline, None),
    };
    (kind, link, properties)
}

/// Content bounds of a heading: ATX markers, closing sequences, and setext
/// underlines excluded.
fn heading_content(text: &str, begin: usize, end: usize) -> (Option<usize>, Option<usize>) {
    let slice = slice_on_boundaries(text, begin, end);
    let hashes = slice.len() - slice.trim_start_matches('#').len();
    let after = &slice[hashes..];
    if (1..=6).contains(&hashes) && (after.is_empty() || after.starts_with([' ', '\t'])) {
        let spaces = after.len() - after.trim_start().len();
        let content_begin = hashes + spaces;
        let trimmed = slice.trim_end();
        let closing = trimmed.len() - trimmed.trim_end_matches('#').len();
        let body = &trimmed[..trimmed.len() - closing];
        // A closing run only counts when whitespace separates it from the text.
        let content_end = if closing > 0 && body.ends_with([' ', '\t']) {
            body.len()
        } else {
            trimmed.len()
        };
        return (
            Some(begin + content_begin),
            Some(begin + content_end.max(content_begin)),
        );
    }
    let first_line = slice.find('\n').unwrap_or(slice.len());
    (None, Some(begin + first_line))
}

struct TreeBuilder<'t> {
    text: &'t str,
    lines: LineIndex,
    elements: Vec<Element>,
}

impl TreeBuilder<'_> {
    fn visit<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        parent: Option<usize>,
        parent_span: (usize, usize),
    ) {
        let (kind, link, properties, start, end) = {
            let data = node.data();
            let (kind, link, properties) = describe(&data.value);
            let pos = data.sourcepos;
            (
                kind,
                link,
                properties,
                (pos.start.line, pos.start.column),
                (pos.end.line, pos.end.column),
            )
        };

        let (begin, end) = if kind == ElementKind::Document {
            (0, self.text.len())
        } else {
            // Inline positions can be missing; fall back to the enclosing block.
            self.lines.span(start, end).unwrap_or(parent_span)
        };
        let (content_begin, content_end) = if kind == ElementKind::Heading {
            heading_content(self.text, begin, end)
        } else {
            (None, None)
        };

        let index = self.elements.len();
        self.elements.push(Element {
            kind,
            begin,
            end,
            content_begin,
            content_end,
            parent,
            properties,
            link,
        });

        for child in node.children() {
            self.visit(child, Some(index), (begin, end));
        }
    }
}

/// CommonMark + wikilink parser backed by `comrak`.
///
/// Links inside fenced or inline code are plain text and never surface as
/// link elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    fn options() -> Options<'static> {
        let mut options = Options::default();
        // Obsidian-style `[[target|title]]` wikilinks.
        options.extension.wikilinks_title_after_pipe = true;
        options.extension.table = true;
        options
    }
}

impl StructuralParser for MarkdownParser {
    fn parse(&self, text: &str) -> Result<ElementTree, String> {
        if text.contains('\0') {
            return Err("binary content (NUL byte)".to_string());
        }
        let options = Self::options();
        let arena = Arena::new();
        let root = parse_document(&arena, text, &options);

        let mut builder = TreeBuilder {
            text,
            lines: LineIndex::new(text),
            elements: Vec::new(),
        };
        builder.visit(root, None, (0, text.len()));
        Ok(ElementTree::new(builder.elements))
    }
}
