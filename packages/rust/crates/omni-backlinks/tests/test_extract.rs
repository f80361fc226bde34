//! Integration tests for link extraction and excerpts.

use omni_backlinks::{
    BacklinkError, Corpus, ExtractedLink, LinkStyle, MarkdownParser, extract_links,
    extract_links_from_text, rebuild_index,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_file(path: &Path, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn target_ids(corpus: &Corpus, links: &[ExtractedLink]) -> Vec<String> {
    links
        .iter()
        .filter_map(|link| corpus.id_of(&link.target))
        .map(|id| id.to_string())
        .collect()
}

fn excerpts(links: &[ExtractedLink]) -> Vec<&str> {
    links.iter().map(|link| link.excerpt.as_str()).collect()
}

#[test]
fn test_excerpt_is_innermost_enclosing_block() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let source = tmp.path().join("a.md");
    write_file(
        &source,
        "# Heading with [[B]]\n\nPara one links [[B]] here.\n\n- item to [[C]]\n- other\n\n> quoted [[B]]\n",
    )?;

    let corpus = Corpus::new(tmp.path(), "md");
    let links = extract_links(&corpus, &MarkdownParser, &source)?;
    assert_eq!(target_ids(&corpus, &links), vec!["B", "B", "C", "B"]);
    assert_eq!(
        excerpts(&links),
        vec![
            "Heading with [[B]]",
            "Para one links [[B]] here.",
            "item to [[C]]",
            "quoted [[B]]",
        ]
    );
    assert!(links.iter().all(|link| link.style == LinkStyle::Wiki));
    Ok(())
}

#[test]
fn test_non_local_references_are_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let corpus = Corpus::new(tmp.path(), "md");
    let text = "[w](https://example.org/B.md) [a](#top) [img](pic.png) [m](mailto:x@y.z) `[[B]]`\n\n```\n[[C]]\n```\n";
    let links = extract_links_from_text(&corpus, &MarkdownParser, &tmp.path().join("a.md"), text)?;
    assert!(links.is_empty(), "unexpected links: {links:?}");
    Ok(())
}

#[test]
fn test_inline_links_resolve_relative_to_source() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let source = tmp.path().join("sub/a.md");
    write_file(
        &source,
        "[up](../b.md) and [same](c.md) and [rooted](/sub/c.md) and [file](file:c.md)\n",
    )?;

    let corpus = Corpus::new(tmp.path(), "md");
    let links = extract_links(&corpus, &MarkdownParser, &source)?;
    assert_eq!(
        target_ids(&corpus, &links),
        vec!["b", "sub/c", "sub/c", "sub/c"]
    );
    assert_eq!(links[0].style, LinkStyle::Inline);
    assert_eq!(links[3].style, LinkStyle::FileScheme);
    Ok(())
}

#[test]
fn test_wikilink_alias_and_anchor_are_stripped() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let corpus = Corpus::new(tmp.path(), "md");
    let links = extract_links_from_text(
        &corpus,
        &MarkdownParser,
        &tmp.path().join("deep/a.md"),
        "see [[B|the bee]] and [[notes/C#Part]]\n",
    )?;
    assert_eq!(target_ids(&corpus, &links), vec!["B", "notes/C"]);
    assert_eq!(
        excerpts(&links),
        vec!["see [[B|the bee]] and [[notes/C#Part]]"; 2]
    );
    Ok(())
}

#[test]
fn test_targets_outside_root_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    fs::create_dir_all(tmp.path().join("notes"))?;
    let corpus = Corpus::new(tmp.path().join("notes"), "md");
    let links = extract_links_from_text(
        &corpus,
        &MarkdownParser,
        &corpus.root().join("a.md"),
        "[out](../outside.md) [[../escape]]\n",
    )?;
    assert!(links.is_empty(), "unexpected links: {links:?}");
    Ok(())
}

#[test]
fn test_unreadable_content_is_a_parse_failure() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let corpus = Corpus::new(tmp.path(), "md");

    let invalid_utf8 = tmp.path().join("binary.md");
    fs::write(&invalid_utf8, [0xff, 0xfe, 0x00, 0x9f])?;
    assert!(matches!(
        extract_links(&corpus, &MarkdownParser, &invalid_utf8),
        Err(BacklinkError::DocumentParseFailure { .. })
    ));

    let with_nul = tmp.path().join("nul.md");
    fs::write(&with_nul, "text\0[[B]]")?;
    assert!(matches!(
        extract_links(&corpus, &MarkdownParser, &with_nul),
        Err(BacklinkError::DocumentParseFailure { .. })
    ));

    assert!(matches!(
        extract_links(&corpus, &MarkdownParser, &tmp.path().join("missing.md")),
        Err(BacklinkError::DocumentParseFailure { .. })
    ));
    Ok(())
}

#[test]
fn test_percent_encoded_targets_name_the_real_document() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let source = tmp.path().join("A.md");
    write_file(&source, "see [n](my%20note.md)\n")?;
    write_file(&tmp.path().join("my note.md"), "x\n")?;

    let corpus = Corpus::new(tmp.path(), "md");
    let links = extract_links(&corpus, &MarkdownParser, &source)?;
    assert_eq!(target_ids(&corpus, &links), vec!["my note"]);
    assert_eq!(excerpts(&links), vec!["see [n](my%20note.md)"]);

    let index = rebuild_index(&corpus, &MarkdownParser).index;
    assert_eq!(index.get("my note")["A"], vec!["see [n](my%20note.md)"]);
    assert!(index.get("my%20note").is_empty());
    Ok(())
}

#[test]
fn test_atx_closing_hashes_are_not_excerpt_text() -> Result<(), Box<dyn std::error::Error>> {
    let tmp = TempDir::new()?;
    let corpus = Corpus::new(tmp.path(), "md");
    let links = extract_links_from_text(
        &corpus,
        &MarkdownParser,
        &tmp.path().join("a.md"),
        "# Ti [[B]] ##\n\n## C# notes [[C]]\n",
    )?;
    assert_eq!(excerpts(&links), vec!["Ti [[B]]", "C# notes [[C]]"]);
    Ok(())
}
