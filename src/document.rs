//! In-memory WiX source document
//!
//! A small owned element tree. Attributes keep insertion order so the
//! serialized document is stable from one build to the next.

use crate::writer::XmlWriter;

/// Child of an element
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute
    pub fn attr(mut self, name: &str, value: impl ToString) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder-style optional attribute
    pub fn attr_opt<T: ToString>(mut self, name: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.set_attr(name, value);
        }
        self
    }

    /// Builder-style child
    pub fn with(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    pub fn with_cdata(mut self, text: &str) -> Self {
        self.children.push(Node::CData(text.to_string()));
        self
    }

    pub fn set_attr(&mut self, name: &str, value: impl ToString) {
        let value = value.to_string();
        match self.attrs.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(n, _)| n == name)?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_attr("Id")
    }

    /// Append extra caller-supplied attributes
    pub fn extend_attrs<'a>(&mut self, attrs: impl IntoIterator<Item = (&'a String, &'a String)>) {
        for (name, value) in attrs {
            self.set_attr(name, value);
        }
    }

    /// Append a child element and return it for further building
    pub fn add(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        match self.children.last_mut() {
            Some(Node::Element(e)) => e,
            _ => unreachable!("element was just pushed"),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    pub fn has_elements(&self) -> bool {
        self.elements().next().is_some()
    }

    /// First child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// First child with the given name, created at the end if missing
    pub fn child_or_create(&mut self, name: &str) -> &mut Element {
        self.child_matching_or_add(|e| e.name == name, || Element::new(name))
    }

    /// First child element matching `pred`, or the one built by `make`
    /// appended at the end
    pub fn child_matching_or_add(
        &mut self,
        pred: impl Fn(&Element) -> bool,
        make: impl FnOnce() -> Element,
    ) -> &mut Element {
        let pos = self
            .children
            .iter()
            .position(|n| matches!(n, Node::Element(e) if pred(e)));
        match pos {
            Some(pos) => match &mut self.children[pos] {
                Node::Element(e) => e,
                _ => unreachable!("position matched an element"),
            },
            None => self.add(make()),
        }
    }

    /// Depth-first search over all descendants
    pub fn find(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    pub fn find_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        for child in self.elements_mut() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find_mut(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Descendant element with the given name and id
    pub fn find_by_id(&self, name: &str, id: &str) -> Option<&Element> {
        self.find(&|e| e.name == name && e.id() == Some(id))
    }

    pub fn find_by_id_mut(&mut self, name: &str, id: &str) -> Option<&mut Element> {
        self.find_mut(&|e| e.name == name && e.id() == Some(id))
    }

    /// All descendants with the given name, document order
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_named(name, &mut found);
        found
    }

    fn collect_named<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_named(name, found);
        }
    }

    /// Remove and return every direct child element matching `pred`
    pub fn take_children(&mut self, pred: impl Fn(&Element) -> bool) -> Vec<Element> {
        let mut taken = Vec::new();
        let mut kept = Vec::with_capacity(self.children.len());
        for node in self.children.drain(..) {
            match node {
                Node::Element(e) if pred(&e) => taken.push(e),
                other => kept.push(other),
            }
        }
        self.children = kept;
        taken
    }

    /// Text content (text and CDATA children concatenated)
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) | Node::CData(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize this element and its subtree
    pub fn write(&self, writer: &mut XmlWriter) {
        writer.write_indent();
        writer.write_element_start(&self.name);
        for (name, value) in &self.attrs {
            writer.write_attribute(name, value);
        }

        if self.children.is_empty() {
            writer.write_element_end_empty();
            writer.newline();
            return;
        }

        writer.write_element_end();

        // Text-only content stays on one line
        if !self.has_elements() {
            for child in &self.children {
                match child {
                    Node::Text(t) => writer.write_text(t),
                    Node::CData(t) => writer.write_cdata(t),
                    Node::Element(_) => {}
                }
            }
            writer.write_close_tag(&self.name);
            writer.newline();
            return;
        }

        writer.newline();
        writer.indent();
        for child in &self.children {
            match child {
                Node::Element(e) => e.write(writer),
                Node::Text(t) => {
                    writer.write_indent();
                    writer.write_text(t);
                    writer.newline();
                }
                Node::CData(t) => {
                    writer.write_indent();
                    writer.write_cdata(t);
                    writer.newline();
                }
            }
        }
        writer.dedent();
        writer.write_indent();
        writer.write_close_tag(&self.name);
        writer.newline();
    }
}

/// Complete source document with its root `Wix` element
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    /// The `Product` (or `Module`) element
    pub fn product(&self) -> Option<&Element> {
        self.root
            .elements()
            .find(|e| e.name == "Product" || e.name == "Module")
    }

    /// Serialize to text, unformatted
    pub fn to_xml(&self) -> String {
        let mut writer = XmlWriter::new(2);
        writer.write_declaration("1.0", Some("utf-8"));
        writer.newline();
        self.root.write(&mut writer);
        writer.finish()
    }
}
