//! Structural parsing seam used by link extraction.
//!
//! A parser turns document text into a flat [`ElementTree`] of typed
//! elements with byte offsets. Extraction only relies on that shape, so the
//! markup grammar stays swappable.

mod links;
mod markdown;

use super::models::{LinkStyle, ReferenceKind};
use std::collections::BTreeMap;

pub use self::links::classify_reference;
pub use self::markdown::MarkdownParser;

/// Structural element types the extractor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Whole document.
    Document,
    /// Paragraph block.
    Paragraph,
    /// Heading block.
    Heading,
    /// List item block.
    ListItem,
    /// Block quote.
    Quote,
    /// Table cell.
    TableCell,
    /// Any other block container (lists, tables, code blocks, ...).
    Container,
    /// Link inline.
    Link,
    /// Any other inline.
    Inline,
}

impl ElementKind {
    /// Block elements that can enclose a link and supply its excerpt.
    #[must_use]
    pub fn is_block(self) -> bool {
        matches!(
            self,
            Self::Paragraph
                | Self::Heading
                | Self::ListItem
                | Self::Quote
                | Self::TableCell
                | Self::Container
        )
    }
}

/// Link payload attached to [`ElementKind::Link`] elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    /// Reference kind.
    pub kind: ReferenceKind,
    /// Syntax the link was written in.
    pub style: LinkStyle,
    /// Target with scheme, anchor, and query removed.
    pub target: String,
    /// Anchor after `#`, when present.
    pub anchor: Option<String>,
}

/// One parsed element. Offsets are byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element type.
    pub kind: ElementKind,
    /// Start offset (inclusive).
    pub begin: usize,
    /// End offset (exclusive).
    pub end: usize,
    /// Start of the element's content, when it differs from `begin`.
    pub content_begin: Option<usize>,
    /// End of the element's content, when it differs from `end`.
    pub content_end: Option<usize>,
    /// Index of the parent element.
    pub parent: Option<usize>,
    /// Free-form properties (raw url, title, ...).
    pub properties: BTreeMap<String, String>,
    /// Link payload for link elements.
    pub link: Option<LinkReference>,
}

impl Element {
    fn contains(&self, offset: usize) -> bool {
        self.begin <= offset && (offset < self.end || self.begin == self.end)
    }

    fn span(&self) -> usize {
        self.end.saturating_sub(self.begin)
    }
}

/// Elements of one document in document (pre-)order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementTree {
    elements: Vec<Element>,
}

impl ElementTree {
    /// Wrap pre-ordered elements.
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }

    /// All elements.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Link elements in document order.
    pub fn links(&self) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(|element| element.kind == ElementKind::Link)
    }

    /// Smallest block element containing `offset`; later elements win ties
    /// since they are nested deeper.
    #[must_use]
    pub fn innermost_block_at(&self, offset: usize) -> Option<&Element> {
        self.elements
            .iter()
            .filter(|element| element.kind.is_block() && element.contains(offset))
            .fold(None, |best: Option<&Element>, element| match best {
                Some(current) if current.span() < element.span() => Some(current),
                _ => Some(element),
            })
    }

    /// Content text of `element`: `content_begin..content_end`, falling back
    /// to `begin..end`, trimmed.
    #[must_use]
    pub fn content_text<'t>(&self, text: &'t str, element: &Element) -> &'t str {
        let begin = element.content_begin.unwrap_or(element.begin);
        let end = element.content_end.unwrap_or(element.end);
        slice_on_boundaries(text, begin, end).trim()
    }
}

/// Slice `text[begin..end]`, clamping both ends onto char boundaries.
pub(crate) fn slice_on_boundaries(text: &str, begin: usize, end: usize) -> &str {
    let clamp = |mut idx: usize| {
        idx = idx.min(text.len());
        while !text.is_char_boundary(idx) {
            idx -= 1;
        }
        idx
    };
    let (begin, end) = (clamp(begin), clamp(end));
    if begin >= end { "" } else { &text[begin..end] }
}

/// Turns document text into an element tree.
pub trait StructuralParser: Send + Sync {
    /// Parse `text`; `Err` carries a human-readable reason.
    fn parse(&self, text: &str) -> Result<ElementTree, String>;
}
