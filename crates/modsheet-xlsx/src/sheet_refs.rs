use std::borrow::Cow;

use regex::{Captures, NoExpand, Regex};

use crate::XlsxError;

/// Retargets sheet-qualified references (`'From'!A1`, `From!A1`) in raw worksheet XML.
///
/// Only two textual shapes are rewritten: the quoted name, and the bare name when it is not the
/// tail of a longer identifier or of a quoted name. This is a text substitution over the whole
/// part, so a matching string in a cell's literal text is rewritten too.
#[derive(Debug, Clone)]
pub struct SheetReferenceRewrite {
    from: String,
    to: String,
    quoted: Regex,
    bare: Regex,
}

impl SheetReferenceRewrite {
    pub fn new(from: &str, to: &str) -> Result<Self, XlsxError> {
        let quoted = Regex::new(&format!("'{}'!", regex::escape(&quote_escape(from))))
            .map_err(|err| XlsxError::Invalid(format!("sheet reference pattern: {err}")))?;
        let bare = Regex::new(&format!("(^|[^A-Za-z0-9_']){}!", regex::escape(from)))
            .map_err(|err| XlsxError::Invalid(format!("sheet reference pattern: {err}")))?;
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
            quoted,
            bare,
        })
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn apply<'a>(&self, xml: &'a str) -> Cow<'a, str> {
        let target = format!("'{}'!", quote_escape(&self.to));
        match self.quoted.replace_all(xml, NoExpand(&target)) {
            Cow::Borrowed(text) => self.replace_bare(text, &target),
            Cow::Owned(text) => Cow::Owned(self.replace_bare(&text, &target).into_owned()),
        }
    }

    fn replace_bare<'a>(&self, text: &'a str, target: &str) -> Cow<'a, str> {
        self.bare
            .replace_all(text, |caps: &Captures<'_>| format!("{}{target}", &caps[1]))
    }
}

/// Apostrophes inside a quoted sheet name are doubled.
fn quote_escape(name: &str) -> String {
    name.replace('\'', "''")
}
