// src/document.rs
//! Locator and splice logic for the published HTML document.
//!
//! The matching rules live here so they are testable in isolation from the
//! pipeline: `find_anchor` for the insertion sentinel, `has_entry_for` for
//! the per-entry date marker, and `insert_before_anchor` for the splice.

use thiserror::Error;

use crate::sources::types::Candidate;

/// Sentinel comment marking where new entries are spliced in.
pub const DEFAULT_ANCHOR: &str = "<!-- reviews:insert -->";

/// Attribute stamped on every published entry. The idempotency check matches
/// this attribute syntax only, so dates in prose never count as published.
pub const DATE_ATTR: &str = "data-published";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("insertion anchor `{anchor}` not found in document")]
    AnchorNotFound { anchor: String },
    #[error("insertion anchor `{anchor}` occurs {count} times, expected exactly one")]
    AmbiguousAnchor { anchor: String, count: usize },
}

fn entry_marker(stamp: &str) -> String {
    format!("{DATE_ATTR}=\"{stamp}\"")
}

/// True if the document already carries an entry stamped with `stamp`.
/// Any entry marker with the given date counts, regardless of which section
/// it sits in.
pub fn has_entry_for(document: &str, stamp: &str) -> bool {
    document.contains(&entry_marker(stamp))
}

/// Byte offset of the unique anchor occurrence. Zero or multiple occurrences
/// fail loudly; the splice never silently picks a match.
pub fn find_anchor(document: &str, anchor: &str) -> Result<usize, DocumentError> {
    let mut positions = document.match_indices(anchor).map(|(pos, _)| pos);
    let first = positions.next().ok_or_else(|| DocumentError::AnchorNotFound {
        anchor: anchor.to_string(),
    })?;
    let extra = positions.count();
    if extra > 0 {
        return Err(DocumentError::AmbiguousAnchor {
            anchor: anchor.to_string(),
            count: extra + 1,
        });
    }
    Ok(first)
}

/// Splice `content` immediately before the anchor. Everything else, the
/// anchor included, is preserved byte-for-byte. Re-invoking appends; duplicate
/// prevention is the idempotency check's job, not this function's.
pub fn insert_before_anchor(
    document: &str,
    anchor: &str,
    content: &str,
) -> Result<String, DocumentError> {
    let pos = find_anchor(document, anchor)?;
    let mut out = String::with_capacity(document.len() + content.len());
    out.push_str(&document[..pos]);
    out.push_str(content);
    out.push_str(&document[pos..]);
    Ok(out)
}

/// Render one review card, stamped with the run's date marker. The title and
/// link are escaped; `body_markup` is inserted as produced.
pub fn render_entry(candidate: &Candidate, body_markup: &str, stamp: &str) -> String {
    let item = &candidate.item;
    format!(
        "<div class=\"review-card\" {marker}>\n  <h3><a href=\"{href}\">{title}</a></h3>\n  {body_markup}\n</div>\n",
        marker = entry_marker(stamp),
        href = html_escape::encode_double_quoted_attribute(&item.link),
        title = html_escape::encode_text(&item.title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const DOC: &str = "<html><body>\n<!--INSERT-->\n</body></html>";

    #[test]
    fn insert_places_content_immediately_before_sentinel() {
        let out = insert_before_anchor(DOC, "<!--INSERT-->", "<div>X</div>").unwrap();
        assert_eq!(out, "<html><body>\n<div>X</div><!--INSERT-->\n</body></html>");
        // Sentinel survives for the next run.
        assert!(out.contains("<!--INSERT-->"));
    }

    #[test]
    fn reinvoking_appends_rather_than_overwrites() {
        let once = insert_before_anchor(DOC, "<!--INSERT-->", "A").unwrap();
        let twice = insert_before_anchor(&once, "<!--INSERT-->", "B").unwrap();
        assert!(twice.contains("AB<!--INSERT-->"));
    }

    #[test]
    fn missing_anchor_fails() {
        let err = insert_before_anchor(DOC, "<!--OTHER-->", "X").unwrap_err();
        assert_eq!(
            err,
            DocumentError::AnchorNotFound {
                anchor: "<!--OTHER-->".to_string()
            }
        );
    }

    #[test]
    fn ambiguous_anchor_fails_instead_of_guessing() {
        let doc = "<!--INSERT--> middle <!--INSERT-->";
        let err = find_anchor(doc, "<!--INSERT-->").unwrap_err();
        assert_eq!(
            err,
            DocumentError::AmbiguousAnchor {
                anchor: "<!--INSERT-->".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn date_marker_requires_attribute_syntax() {
        let doc = r#"<p>Posted 2026-08-23.</p> <div data-published="2026-08-22"></div>"#;
        assert!(!has_entry_for(doc, "2026-08-23"));
        assert!(has_entry_for(doc, "2026-08-22"));
    }

    #[test]
    fn rendered_entry_carries_the_marker() {
        let candidate = Candidate {
            item: crate::sources::types::SourceItem {
                title: "Tool & Co".into(),
                summary: String::new(),
                link: "https://t.example".into(),
                source_id: "a".into(),
                fetched_at: Utc::now(),
            },
            dedup_key: "tool & co".into(),
        };
        let card = render_entry(&candidate, "<p>body</p>", "2026-08-23");
        assert!(has_entry_for(&card, "2026-08-23"));
        assert!(card.contains("Tool &amp; Co"));
        assert!(card.contains("<p>body</p>"));
    }
}
