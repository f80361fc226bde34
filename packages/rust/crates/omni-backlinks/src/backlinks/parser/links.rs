use super::LinkReference;
use std::borrow::Cow;
use crate::backlinks::models::{LinkStyle, ReferenceKind};

const WEB_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

/// Split `scheme:rest` when the prefix looks like a URL scheme.
///
/// Single-letter prefixes are drive letters (`C:`), not schemes.
fn split_scheme(raw: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = raw.split_once(':')?;
    let valid = scheme.len() > 1
        && scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

fn split_anchor(raw: &str) -> (String, Option<String>) {
    let (path_part, anchor) = match raw.split_once('#') {
        Some((left, right)) => {
            let anchor = right.trim();
            (left, (!anchor.is_empty()).then(|| anchor.to_string()))
        }
        None => (raw, None),
    };
    let without_query = path_part.split_once('?').map_or(path_part, |(left, _)| left);
    (without_query.trim().to_string(), anchor)
}

/// `my%20note.md` names `my note.md`; undecodable input is kept verbatim.
fn percent_decoded(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned)
}

fn unwrap_destination(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(inner) = trimmed.strip_prefix('<') {
        return inner.split_once('>').map_or(inner, |(left, _)| left);
    }
    trimmed
}

/// Decide reference kind + normalized target for a raw link destination.
///
/// Wikilinks always name local documents (`[[Name#Heading]]` keeps the
/// anchor separately). Inline links are local files unless they carry a URL
/// scheme or are pure anchors; `file:` prefixes are stripped.
#[must_use]
pub fn classify_reference(raw: &str, wiki: bool) -> LinkReference {
    let destination = unwrap_destination(raw).replace('\\', "/");

    if wiki {
        let (target, anchor) = split_anchor(&destination);
        let kind = if target.is_empty() {
            ReferenceKind::Anchor
        } else {
            ReferenceKind::LocalFile
        };
        return LinkReference {
            kind,
            style: LinkStyle::Wiki,
            target,
            anchor,
        };
    }

    if destination.starts_with('#') {
        let (_, anchor) = split_anchor(&destination);
        return LinkReference {
            kind: ReferenceKind::Anchor,
            style: LinkStyle::Inline,
            target: String::new(),
            anchor,
        };
    }

    match split_scheme(&destination) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("file") => {
            let local = rest.strip_prefix("//").unwrap_or(rest);
            let (target, anchor) = split_anchor(local);
            LinkReference {
                kind: ReferenceKind::LocalFile,
                style: LinkStyle::FileScheme,
                target: percent_decoded(&target),
                anchor,
            }
        }
        Some((scheme, _)) => {
            let lower = scheme.to_lowercase();
            let kind = if WEB_SCHEMES.contains(&lower.as_str()) {
                ReferenceKind::Web
            } else {
                ReferenceKind::Other
            };
            LinkReference {
                kind,
                style: LinkStyle::Inline,
                target: destination.clone(),
                anchor: None,
            }
        }
        None => {
            let (target, anchor) = split_anchor(&destination);
            LinkReference {
                kind: ReferenceKind::LocalFile,
                style: LinkStyle::Inline,
                target: percent_decoded(&target),
                anchor,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wikilink_anchor_is_split_off() {
        let reference = classify_reference("Note#Section", true);
        assert_eq!(reference.kind, ReferenceKind::LocalFile);
        assert_eq!(reference.target, "Note");
        assert_eq!(reference.anchor.as_deref(), Some("Section"));
    }

    #[test]
    fn wikilink_to_own_heading_is_anchor() {
        assert_eq!(
            classify_reference("#Section", true).kind,
            ReferenceKind::Anchor
        );
    }

    #[test]
    fn inline_destinations_are_classified() {
        assert_eq!(
            classify_reference("https://example.com/a.md", false).kind,
            ReferenceKind::Web
        );
        assert_eq!(
            classify_reference("mailto:me@example.com", false).kind,
            ReferenceKind::Other
        );
        assert_eq!(
            classify_reference("#top", false).kind,
            ReferenceKind::Anchor
        );

        let local = classify_reference("../notes/b.md?raw=1#intro", false);
        assert_eq!(local.kind, ReferenceKind::LocalFile);
        assert_eq!(local.style, LinkStyle::Inline);
        assert_eq!(local.target, "../notes/b.md");
        assert_eq!(local.anchor.as_deref(), Some("intro"));
    }

    #[test]
    fn file_scheme_is_local() {
        let reference = classify_reference("file:sub/c.md", false);
        assert_eq!(reference.kind, ReferenceKind::LocalFile);
        assert_eq!(reference.style, LinkStyle::FileScheme);
        assert_eq!(reference.target, "sub/c.md");
    }

    #[test]
    fn percent_escapes_are_decoded_in_local_targets() {
        assert_eq!(
            classify_reference("my%20note.md#top", false).target,
            "my note.md"
        );
        assert_eq!(
            classify_reference("file:sub/caf%C3%A9.md", false).target,
            "sub/café.md"
        );
        assert_eq!(classify_reference("bad%FF.md", false).target, "bad%FF.md");
    }

    #[test]
    fn angle_bracket_destination_is_unwrapped() {
        let reference = classify_reference("<my notes/b.md>", false);
        assert_eq!(reference.target, "my notes/b.md");
    }
}
