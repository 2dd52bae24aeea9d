//! XML-Kommentare fuer `##MD` Bloecke (HD- und FH-Kommentar).
//!
//! Geschrieben wird ein minimales, ASAM-konformes Fragment:
//!
//! ```text
//! <HDcomment xmlns="http://www.asam.net/mdf/v4"><TX>...</TX></HDcomment>
//! <FHcomment xmlns="..."><TX>...</TX><tool_id>..</tool_id>...</FHcomment>
//! ```
//!
//! Beim Lesen werden die Textinhalte aller Blatt-Elemente in Dokument-
//! reihenfolge gesammelt (erstes Vorkommen gewinnt).

use quick_xml::escape::{escape, resolve_predefined_entity, unescape};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::{Error, FastIndexMap, Result};

/// Namespace of MDF4 XML metadata.
pub const MDF_NAMESPACE: &str = "http://www.asam.net/mdf/v4";

/// Parsed `##MD` content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    root: String,
    fields: FastIndexMap<String, String>,
}

impl Comment {
    /// Plain comment from a `##TX` block.
    pub fn plain(text: impl Into<String>) -> Self {
        let mut fields = FastIndexMap::default();
        fields.insert("TX".to_string(), text.into());
        Self {
            root: String::new(),
            fields,
        }
    }

    /// Local name of the root element, empty for `##TX` comments.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Content of the `<TX>` element.
    pub fn text(&self) -> Option<&str> {
        self.field("TX")
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Header comment: `<HDcomment><TX>text</TX></HDcomment>`.
pub fn hd_comment(text: &str) -> String {
    format!(
        "<HDcomment xmlns=\"{MDF_NAMESPACE}\"><TX>{}</TX></HDcomment>",
        escape(text)
    )
}

/// File history comment naming the writing tool.
pub fn fh_comment(text: &str, tool_id: &str, tool_vendor: &str, tool_version: &str) -> String {
    format!(
        "<FHcomment xmlns=\"{MDF_NAMESPACE}\"><TX>{}</TX><tool_id>{}</tool_id>\
         <tool_vendor>{}</tool_vendor><tool_version>{}</tool_version></FHcomment>",
        escape(text),
        escape(tool_id),
        escape(tool_vendor),
        escape(tool_version),
    )
}

/// Parst einen `##MD` XML-Kommentar.
pub fn parse_comment(xml: &str) -> Result<Comment> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut comment = Comment::default();
    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(e.local_name().as_ref())?;
                if comment.root.is_empty() && stack.is_empty() {
                    comment.root = name.clone();
                }
                stack.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                if comment.root.is_empty() && stack.is_empty() {
                    comment.root = local_name(e.local_name().as_ref())?;
                }
            }
            Ok(Event::End(_)) => {
                let name = stack
                    .pop()
                    .ok_or_else(|| Error::InvalidMetadata("unbalanced end tag".into()))?;
                // Text wird an Entity-Referenzen zerteilt, daher erst hier trimmen
                let value = text.trim();
                if !value.is_empty() {
                    comment
                        .fields
                        .entry(name)
                        .or_insert_with(|| value.to_string());
                }
                text.clear();
            }
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(&*e)
                    .map_err(|er| Error::InvalidMetadata(er.to_string()))?;
                let value = unescape(raw).map_err(|er| Error::InvalidMetadata(er.to_string()))?;
                text.push_str(&value);
            }
            Ok(Event::CData(e)) => {
                let raw = std::str::from_utf8(&*e)
                    .map_err(|er| Error::InvalidMetadata(er.to_string()))?;
                text.push_str(raw);
            }
            Ok(Event::GeneralRef(e)) => {
                let name = std::str::from_utf8(e.as_ref())
                    .map_err(|er| Error::InvalidMetadata(er.to_string()))?;
                let resolved = resolve_reference(name)
                    .ok_or_else(|| Error::InvalidMetadata(format!("unknown entity &{name};")))?;
                text.push_str(&resolved);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::InvalidMetadata(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(Error::InvalidMetadata(format!("unclosed element <{}>", stack[0])));
    }
    if comment.root.is_empty() {
        return Err(Error::InvalidMetadata("no root element".into()));
    }
    Ok(comment)
}

fn local_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| Error::InvalidMetadata(e.to_string()))
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_predefined_entity(name).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hd_comment_round_trip() {
        let xml = hd_comment("boundary values <i8..f64> & infinity");
        assert!(xml.contains("&lt;i8..f64&gt; &amp; infinity"), "{xml}");
        let c = parse_comment(&xml).unwrap();
        assert_eq!(c.root(), "HDcomment");
        assert_eq!(c.text(), Some("boundary values <i8..f64> & infinity"));
    }

    #[test]
    fn whitespace_around_references_kept() {
        let c = parse_comment("<HDcomment><TX>a &amp; b &lt;c&gt; d</TX></HDcomment>").unwrap();
        assert_eq!(c.text(), Some("a & b <c> d"));
    }

    #[test]
    fn indented_comment_trimmed() {
        let xml = "<HDcomment>\n  <TX>\n    fixture &amp; oracle\n  </TX>\n  <tool_id>x</tool_id>\n</HDcomment>\n";
        let c = parse_comment(xml).unwrap();
        assert_eq!(c.text(), Some("fixture & oracle"));
        assert_eq!(c.field("tool_id"), Some("x"));
        assert_eq!(c.field("HDcomment"), None);
    }

    #[test]
    fn fh_comment_fields_in_order() {
        let xml = fh_comment("created", "mdf4fix", "acme", "0.1.0");
        let c = parse_comment(&xml).unwrap();
        assert_eq!(c.root(), "FHcomment");
        let names: Vec<_> = c.fields().map(|(k, _)| k).collect();
        assert_eq!(names, ["TX", "tool_id", "tool_vendor", "tool_version"]);
        assert_eq!(c.field("tool_version"), Some("0.1.0"));
    }

    #[test]
    fn character_references() {
        let c = parse_comment("<HDcomment><TX>a&#65;&#x42;</TX></HDcomment>").unwrap();
        assert_eq!(c.text(), Some("aAB"));
    }

    #[test]
    fn malformed_xml_rejected() {
        assert!(matches!(
            parse_comment("<HDcomment><TX>x</HDcomment>"),
            Err(Error::InvalidMetadata(_))
        ));
        assert!(matches!(parse_comment("<HDcomment><TX>"), Err(Error::InvalidMetadata(_))));
        assert!(matches!(parse_comment("just text"), Err(Error::InvalidMetadata(_))));
    }

    #[test]
    fn plain_comment() {
        let c = Comment::plain("note");
        assert_eq!(c.text(), Some("note"));
        assert_eq!(c.root(), "");
    }
}
