use crate::xml::XmlElement;

pub const WORKSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// Make sure `[Content_Types].xml` carries an `<Override>` for `part_name`.
///
/// `part_name` is package-relative without the leading slash. Returns `false` when an override
/// for the part already existed.
pub fn ensure_override(types: &mut XmlElement, part_name: &str, content_type: &str) -> bool {
    let absolute = format!("/{}", part_name.trim_start_matches('/'));
    let exists = types.elements().any(|el| {
        el.local_name() == "Override"
            && el
                .attr("PartName")
                .is_some_and(|p| p.eq_ignore_ascii_case(&absolute))
    });
    if exists {
        return false;
    }

    let el = XmlElement::new(types.prefixed_name("Override"))
        .with_attr("PartName", absolute)
        .with_attr("ContentType", content_type);
    types.push_element(el);
    true
}
