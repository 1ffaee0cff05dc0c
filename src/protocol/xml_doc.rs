//! Minimal XML document model for the xml-based protocols.
//!
//! The writer emits compact documents without whitespace; the reader
//! understands elements, text, CDATA, comments and the prolog, and skips
//! attributes.

/// Compact XML writer.
#[derive(Debug, Default)]
pub(crate) struct XmlWriter {
    out: String,
}

impl XmlWriter {
    pub fn new() -> Self {
        let mut writer = Self::default();
        writer.out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        writer
    }

    pub fn open(&mut self, name: &str, xmlns: Option<&str>) {
        self.out.push('<');
        self.out.push_str(name);
        if let Some(ns) = xmlns {
            self.out.push_str(" xmlns=\"");
            self.out.push_str(&escape(ns));
            self.out.push('"');
        }
        self.out.push('>');
    }

    pub fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    pub fn text_element(&mut self, name: &str, text: &str) {
        self.open(name, None);
        self.out.push_str(&escape(text));
        self.close(name);
    }

    pub fn finish(self) -> Vec<u8> {
        self.out.into_bytes()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// A parsed element.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First element named `name`, depth-first, including `self`.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

/// Parse a document into its root element.
pub(crate) fn parse_document(src: &str) -> Result<XmlElement, String> {
    let mut reader = XmlReader { src, pos: 0 };
    reader.skip_misc()?;
    reader.element()
}

struct XmlReader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> XmlReader<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Skip whitespace, processing instructions and comments.
    fn skip_misc(&mut self) -> Result<(), String> {
        loop {
            let trimmed = self.rest().trim_start();
            self.pos = self.src.len() - trimmed.len();
            if trimmed.starts_with("<?") {
                self.skip_past("?>")?;
            } else if trimmed.starts_with("<!--") {
                self.skip_past("-->")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_past(&mut self, marker: &str) -> Result<(), String> {
        match self.rest().find(marker) {
            Some(i) => {
                self.pos += i + marker.len();
                Ok(())
            }
            None => Err(format!("unterminated markup, expected {}", marker)),
        }
    }

    fn element(&mut self) -> Result<XmlElement, String> {
        if !self.rest().starts_with('<') {
            return Err(format!("expected element at offset {}", self.pos));
        }
        self.pos += 1;

        let name_len = self
            .rest()
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .ok_or("unterminated start tag")?;
        let mut element = XmlElement {
            name: self.rest()[..name_len].to_string(),
            ..Default::default()
        };
        self.pos += name_len;

        // Attributes are skipped; quoted values may contain '>' or '/'.
        let mut quote = None;
        let mut self_closing = false;
        loop {
            let c = self.rest().chars().next().ok_or("unterminated start tag")?;
            self.pos += c.len_utf8();
            match (quote, c) {
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"') | (None, '\'') => quote = Some(c),
                (None, '>') => break,
                (None, c) => self_closing = c == '/',
            }
        }
        if self_closing {
            return Ok(element);
        }

        loop {
            let rest = self.rest();
            if rest.starts_with("</") {
                let end = rest.find('>').ok_or("unterminated end tag")?;
                let closing = rest[2..end].trim();
                if closing != element.name {
                    return Err(format!(
                        "mismatched end tag {} for {}",
                        closing, element.name
                    ));
                }
                self.pos += end + 1;
                return Ok(element);
            } else if rest.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let end = cdata.find("]]>").ok_or("unterminated CDATA section")?;
                element.text.push_str(&cdata[..end]);
                self.pos += "<![CDATA[".len() + end + "]]>".len();
            } else if rest.starts_with('<') {
                element.children.push(self.element()?);
            } else if rest.is_empty() {
                return Err(format!("unterminated element {}", element.name));
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                element.text.push_str(&unescape(&rest[..end]));
                self.pos += end;
            }
        }
    }
}
