//! Backlink Aggregator: fold extracted links into one reverse index.

use super::corpus::Corpus;
use super::models::{BacklinkIndex, ExtractedLink, LinkRecord};

/// Map one extracted link onto document ids; `None` when either end is not
/// a corpus document.
#[must_use]
pub fn to_record(corpus: &Corpus, link: ExtractedLink) -> Option<LinkRecord> {
    Some(LinkRecord {
        source: corpus.id_of(&link.source)?,
        target: corpus.id_of(&link.target)?,
        excerpt: link.excerpt,
    })
}

/// Fold links into a fresh snapshot. Self-links are kept like any other.
pub fn aggregate(corpus: &Corpus, links: impl IntoIterator<Item = ExtractedLink>) -> BacklinkIndex {
    BacklinkIndex::from_records(
        links
            .into_iter()
            .filter_map(|link| to_record(corpus, link)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlinks::models::LinkStyle;
    use std::path::PathBuf;

    fn link(source: &str, target: &str, excerpt: &str) -> ExtractedLink {
        ExtractedLink {
            source: PathBuf::from(format!("/nonexistent/notes/{source}.md")),
            target: PathBuf::from(format!("/nonexistent/notes/{target}.md")),
            excerpt: excerpt.to_string(),
            style: LinkStyle::Wiki,
        }
    }

    #[test]
    fn self_links_populate_the_index() {
        let corpus = Corpus::new("/nonexistent/notes", "md");
        let index = aggregate(&corpus, [link("A", "A", "loop to [[A]]")]);
        assert_eq!(index.get("A")["A"], vec!["loop to [[A]]"]);
    }

    #[test]
    fn links_outside_the_corpus_are_dropped() {
        let corpus = Corpus::new("/nonexistent/notes", "md");
        let mut outside = link("A", "B", "x");
        outside.target = PathBuf::from("/elsewhere/B.md");
        let index = aggregate(&corpus, [outside, link("A", "sub/C", "y")]);
        assert!(index.get("B").is_empty());
        assert_eq!(index.get("sub/C")["A"], vec!["y"]);
    }
}
