use crate::xml::XmlElement;

pub const WORKSHEET_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
pub const SHARED_STRINGS_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub type_uri: String,
    pub target: String,
    pub target_mode: Option<String>,
}

impl Relationship {
    pub fn is_external(&self) -> bool {
        self.target_mode
            .as_deref()
            .is_some_and(|mode| mode.trim().eq_ignore_ascii_case("External"))
    }
}

/// Relationships declared in a parsed `.rels` part, in document order.
pub fn relationships(root: &XmlElement) -> Vec<Relationship> {
    root.elements()
        .filter(|el| el.local_name().eq_ignore_ascii_case("Relationship"))
        .filter_map(|el| {
            Some(Relationship {
                id: el.attr_local("Id")?.to_string(),
                type_uri: el.attr_local("Type")?.to_string(),
                target: el.attr_local("Target")?.to_string(),
                target_mode: el.attr_local("TargetMode").map(str::to_string),
            })
        })
        .collect()
}

/// `rId{max + 1}` over every `rIdN` id already present.
pub fn next_relationship_id(root: &XmlElement) -> String {
    let max = relationships(root)
        .iter()
        .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("rId{}", max + 1)
}

/// Append a relationship element, reusing the root's namespace prefix.
pub fn push_relationship(root: &mut XmlElement, id: &str, type_uri: &str, target: &str) {
    let el = XmlElement::new(root.prefixed_name("Relationship"))
        .with_attr("Id", id)
        .with_attr("Type", type_uri)
        .with_attr("Target", target);
    root.push_element(el);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlDocument;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="custom" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

    #[test]
    fn parses_relationships_in_order() {
        let doc = XmlDocument::parse("xl/_rels/workbook.xml.rels", RELS.as_bytes()).unwrap();
        let rels = relationships(&doc.root);
        let ids: Vec<&str> = rels.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rId3", "rId1", "custom"]);
        assert!(rels[2].is_external());
        assert!(!rels[1].is_external());
    }

    #[test]
    fn next_id_skips_non_numeric_ids() {
        let mut doc = XmlDocument::parse("r.rels", RELS.as_bytes()).unwrap();
        assert_eq!(next_relationship_id(&doc.root), "rId4");
        push_relationship(&mut doc.root, "rId4", WORKSHEET_REL_TYPE, "worksheets/sheet2.xml");
        assert_eq!(next_relationship_id(&doc.root), "rId5");
    }
}
