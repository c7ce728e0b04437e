//! XML output writer

/// XML writer for the generated source document
pub struct XmlWriter {
    output: String,
    indent_size: usize,
    indent_level: usize,
}

impl XmlWriter {
    pub fn new(indent_size: usize) -> Self {
        Self {
            output: String::new(),
            indent_size,
            indent_level: 0,
        }
    }

    /// Get the written output, trailing whitespace trimmed
    pub fn finish(self) -> String {
        let mut output = self
            .output
            .lines()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n");

        if !output.ends_with('\n') {
            output.push('\n');
        }

        output
    }

    /// Write a newline
    pub fn newline(&mut self) {
        self.output.push('\n');
    }

    /// Write current indentation
    pub fn write_indent(&mut self) {
        let indent = " ".repeat(self.indent_size * self.indent_level);
        self.output.push_str(&indent);
    }

    /// Increase indent level
    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    /// Decrease indent level
    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    /// Write XML declaration
    pub fn write_declaration(&mut self, version: &str, encoding: Option<&str>) {
        self.output.push_str("<?xml version=\"");
        self.output.push_str(&escape_attr(version));
        self.output.push('"');
        if let Some(enc) = encoding {
            self.output.push_str(" encoding=\"");
            self.output.push_str(&escape_attr(enc));
            self.output.push('"');
        }
        self.output.push_str("?>");
    }

    /// Write opening tag start (just the element name)
    pub fn write_element_start(&mut self, name: &str) {
        self.output.push('<');
        self.output.push_str(name);
    }

    /// Write an attribute
    pub fn write_attribute(&mut self, name: &str, value: &str) {
        self.output.push(' ');
        self.output.push_str(name);
        self.output.push_str("=\"");
        self.output.push_str(&escape_attr(value));
        self.output.push('"');
    }

    /// Close opening tag (not self-closing)
    pub fn write_element_end(&mut self) {
        self.output.push('>');
    }

    /// Close self-closing tag
    pub fn write_element_end_empty(&mut self) {
        self.output.push_str(" />");
    }

    /// Write closing tag
    pub fn write_close_tag(&mut self, name: &str) {
        self.output.push_str("</");
        self.output.push_str(name);
        self.output.push('>');
    }

    /// Write text content
    pub fn write_text(&mut self, text: &str) {
        self.output.push_str(&escape_text(text));
    }

    /// Write CDATA section
    pub fn write_cdata(&mut self, content: &str) {
        self.output.push_str("<![CDATA[");
        // A literal terminator inside the content has to be split across sections
        self.output.push_str(&content.replace("]]>", "]]]]><![CDATA[>"));
        self.output.push_str("]]>");
    }
}

/// Escape special characters in attribute values
fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in text content
fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}

/// Opening tags that never start a new group
const MERGE_SECTIONS: &[&str] = &["<Wix ", "<Media ", "<File ", "<MultiStringValue>"];

/// Tags always preceded by a blank line
const SPLIT_SECTIONS: &[&str] = &["</Product>", "</Module>"];

/// Readability pass over serialized source.
///
/// Separates runs of differently named siblings with a blank line, and
/// sets off every component and the closing product tag. Only whitespace
/// changes, and never inside a CDATA section.
pub fn format_source(xml: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut prev = "";
    let mut in_cdata = false;

    for line in xml.lines() {
        let continues_cdata = in_cdata;
        in_cdata = ends_in_cdata(line, in_cdata);
        if continues_cdata {
            out.push(line);
            continue;
        }

        let trimmed = line.trim();
        let prev_trimmed = prev.trim();

        if prev_trimmed.is_empty() && trimmed.is_empty() {
            continue;
        }

        let mut blank = false;

        if !prev_trimmed.is_empty() && left_indent(prev) == left_indent(line) {
            if first_token(prev_trimmed) != first_token(trimmed)
                && !MERGE_SECTIONS.iter().any(|s| trimmed.starts_with(s))
            {
                blank = true;
            }
        } else if trimmed.starts_with("<Component ")
            || (trimmed == "</Directory>" && prev_trimmed == "</Component>")
        {
            blank = true;
        }

        if SPLIT_SECTIONS.iter().any(|s| trimmed.starts_with(s)) {
            blank = true;
        }

        if blank {
            out.push("");
        }
        out.push(line);
        prev = line;
    }

    let mut result = out.join("\n");
    result.push('\n');
    result
}

/// Whether a CDATA section is still open at the end of `line`
fn ends_in_cdata(line: &str, mut inside: bool) -> bool {
    let mut rest = line;
    loop {
        let marker = if inside { "]]>" } else { "<![CDATA[" };
        match rest.find(marker) {
            Some(pos) => {
                rest = &rest[pos + marker.len()..];
                inside = !inside;
            }
            None => return inside,
        }
    }
}

fn left_indent(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

fn first_token(line: &str) -> &str {
    line.split(' ').next().unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_declaration() {
        let mut w = XmlWriter::new(2);
        w.write_declaration("1.0", Some("utf-8"));
        let output = w.finish();
        assert!(output.contains("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
    }

    #[test]
    fn test_write_self_closing() {
        let mut w = XmlWriter::new(2);
        w.write_element_start("File");
        w.write_attribute("Source", "test.exe");
        w.write_element_end_empty();
        let output = w.finish();
        assert!(output.contains("<File Source=\"test.exe\" />"));
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("a&b"), "a&amp;b");
        assert_eq!(escape_attr("a<b"), "a&lt;b");
        assert_eq!(escape_attr("a\"b"), "a&quot;b");
        assert_eq!(escape_attr("a'b"), "a&apos;b");
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("a&b"), "a&amp;b");
        // Quotes not escaped in text
        assert_eq!(escape_text("a\"b"), "a\"b");
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        let mut w = XmlWriter::new(2);
        w.write_cdata("a]]>b");
        assert_eq!(w.finish(), "<![CDATA[a]]]]><![CDATA[>b]]>\n");
    }

    #[test]
    fn test_indentation() {
        let mut w = XmlWriter::new(4);
        w.indent();
        w.write_indent();
        w.write_element_start("A");
        w.write_element_end_empty();
        assert_eq!(w.finish(), "    <A />\n");
    }

    #[test]
    fn test_format_source_groups() {
        let xml = "<Wix>\n  <Product Id=\"x\">\n    <Package />\n    <Media />\n    <Property Id=\"A\" />\n    <Property Id=\"B\" />\n  </Product>\n</Wix>\n";
        let formatted = format_source(xml);
        assert_eq!(
            formatted,
            "<Wix>\n  <Product Id=\"x\">\n    <Package />\n    <Media />\n\n    <Property Id=\"A\" />\n    <Property Id=\"B\" />\n\n  </Product>\n</Wix>\n"
        );
    }

    #[test]
    fn test_format_source_components() {
        let xml = "<Directory Id=\"D\">\n  <Component Id=\"C\">\n    <File />\n  </Component>\n</Directory>\n";
        let formatted = format_source(xml);
        assert!(formatted.contains("<Directory Id=\"D\">\n\n  <Component"));
        assert!(formatted.contains("</Component>\n\n</Directory>"));
    }

    #[test]
    fn test_format_source_leaves_cdata_alone() {
        let xml = "<InstallExecuteSequence>\n  <Custom Action=\"A\"><![CDATA[first\n\n\n  <Property x\nlast]]></Custom>\n  <Custom Action=\"B\" />\n</InstallExecuteSequence>\n";
        assert_eq!(format_source(xml), xml);
    }

    #[test]
    fn test_ends_in_cdata() {
        assert!(ends_in_cdata("<Custom><![CDATA[a", false));
        assert!(!ends_in_cdata("<Custom><![CDATA[a]]></Custom>", false));
        assert!(!ends_in_cdata("b]]></Custom>", true));
        assert!(ends_in_cdata("b]]><![CDATA[c", true));
    }
}
