use crate::XlsxError;

pub const DEFAULT_SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Plain text of every `<si>` item of a shared-strings part, in index order.
///
/// Rich-text runs are flattened; phonetic (`<rPh>`) runs are skipped.
pub fn parse_shared_strings(bytes: &[u8]) -> Result<Vec<String>, XlsxError> {
    let xml = std::str::from_utf8(bytes)?;
    let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
    let doc = roxmltree::Document::parse(xml)?;

    Ok(doc
        .root_element()
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "si")
        .map(item_text)
        .collect())
}

fn item_text(si: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in si.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "t" => out.push_str(child.text().unwrap_or_default()),
            "r" => {
                for t in child
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "t")
                {
                    out.push_str(t.text().unwrap_or_default());
                }
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn flattens_runs_and_skips_phonetics() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>ABC123</t></si>
  <si><r><rPr><b/></rPr><t>Intro</t></r><r><t xml:space="preserve"> to Law</t></r></si>
  <si><t>漢字</t><rPh sb="0" eb="2"><t>かんじ</t></rPh></si>
  <si/>
</sst>"#
            .as_bytes();
        let strings = parse_shared_strings(xml).unwrap();
        assert_eq!(strings, vec!["ABC123", "Intro to Law", "漢字", ""]);
    }

    #[test]
    fn rejects_malformed_xml() {
        let err = parse_shared_strings(b"<sst><si>").unwrap_err();
        assert!(matches!(err, XlsxError::RoXml(_)), "{err:?}");
    }
}
