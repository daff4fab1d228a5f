//! Arena based XML tree.
//!
//! Nodes live in a flat vector and refer to each other by [`NodeId`]. The
//! tree keeps what schema validation and the inventory protocol need:
//! elements with resolved namespaces, attributes, text and the source line
//! of every parsed node. Comments and processing instructions are dropped.

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{InventoryError, InventoryResult};

pub type NodeId = usize;

/// Deepest element nesting accepted by the parser.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub namespace: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Local name.
    pub name: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    /// `xmlns` declarations made on this element, keyed by prefix.
    pub declarations: Vec<(Option<String>, String)>,
}

impl Element {
    fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// 1-based source line, 0 for nodes created in memory.
    pub line: usize,
}

#[derive(Debug, Clone, Default)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl XmlDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, id: NodeId) {
        self.nodes[id].parent = None;
        self.root = Some(id);
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(
            NodeKind::Element(Element {
                name: name.to_string(),
                prefix: None,
                namespace: None,
                attributes: Vec::new(),
                declarations: Vec::new(),
            }),
            0,
        )
    }

    /// Element with a single text child.
    pub fn create_element_with_content(&mut self, name: &str, content: &str) -> NodeId {
        let element = self.create_element(name);
        let text = self.create_text(content);
        self.append_child(element, text);
        element
    }

    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(NodeKind::Text(content.to_string()), 0)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Set or replace an attribute without namespace.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element(element) = &mut self.nodes[id].kind {
            match element
                .attributes
                .iter_mut()
                .find(|a| a.namespace.is_none() && a.name == name)
            {
                Some(attribute) => attribute.value = value.to_string(),
                None => element.attributes.push(Attribute {
                    name: name.to_string(),
                    namespace: None,
                    value: value.to_string(),
                }),
            }
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id].kind {
            NodeKind::Element(element) => Some(element),
            NodeKind::Text(_) => None,
        }
    }

    /// Local name of an element node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|&child| matches!(self.nodes[child].kind, NodeKind::Element(_)))
    }

    pub fn first_child_element(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.element_children(id)
            .find(|&child| self.name(child) == Some(name))
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut content = String::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            match &self.nodes[id].kind {
                NodeKind::Text(text) => content.push_str(text),
                NodeKind::Element(_) => stack.extend(self.nodes[id].children.iter().rev()),
            }
        }
        content
    }

    pub fn line(&self, id: NodeId) -> usize {
        self.nodes[id].line
    }

    /// First element with the given local name in document order.
    pub fn find_first(&self, name: &str) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            if self.name(id) == Some(name) {
                return Some(id);
            }
            stack.extend(self.nodes[id].children.iter().rev());
        }
        None
    }

    fn push(&mut self, kind: NodeKind, line: usize) -> NodeId {
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            line,
        });
        self.nodes.len() - 1
    }

    /// Parse a UTF-8 encoded document.
    pub fn parse(input: &[u8]) -> InventoryResult<Self> {
        Parser::new(input).run()
    }

    pub fn parse_str(input: &str) -> InventoryResult<Self> {
        Self::parse(input.as_bytes())
    }

    pub fn load(path: impl AsRef<Path>) -> InventoryResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::parse(&bytes)
    }

    /// Serialize with XML declaration and two space indentation.
    pub fn to_bytes(&self) -> InventoryResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| InventoryError::xml(e.to_string()))?;
        if let Some(root) = self.root {
            self.write_node(&mut writer, root)?;
        }
        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn to_xml_string(&self) -> InventoryResult<String> {
        String::from_utf8(self.to_bytes()?).map_err(|e| InventoryError::xml(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> InventoryResult<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> InventoryResult<()> {
        let node = &self.nodes[id];
        match &node.kind {
            NodeKind::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|e| InventoryError::xml(e.to_string())),
            NodeKind::Element(element) => {
                let name = element.qualified_name();
                let mut start = BytesStart::new(name.as_str());
                for (prefix, uri) in &element.declarations {
                    let key = match prefix {
                        Some(prefix) => format!("xmlns:{prefix}"),
                        None => "xmlns".to_string(),
                    };
                    start.push_attribute((key.as_str(), uri.as_str()));
                }
                for attribute in &element.attributes {
                    start.push_attribute((attribute.name.as_str(), attribute.value.as_str()));
                }
                if node.children.is_empty() {
                    return writer
                        .write_event(Event::Empty(start))
                        .map_err(|e| InventoryError::xml(e.to_string()));
                }
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| InventoryError::xml(e.to_string()))?;
                for &child in &node.children {
                    self.write_node(writer, child)?;
                }
                writer
                    .write_event(Event::End(BytesEnd::new(name.as_str())))
                    .map_err(|e| InventoryError::xml(e.to_string()))
            }
        }
    }
}

struct Parser<'a> {
    input: &'a [u8],
    document: XmlDocument,
    open: Vec<NodeId>,
    /// In-scope namespace URIs per prefix, innermost last.
    bindings: HashMap<Option<String>, Vec<String>>,
    /// Prefixes declared by each open element.
    declared: Vec<Vec<Option<String>>>,
    line: usize,
    counted_to: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            document: XmlDocument::new(),
            open: Vec::new(),
            bindings: HashMap::new(),
            declared: Vec::new(),
            line: 1,
            counted_to: 0,
        }
    }

    fn run(mut self) -> InventoryResult<XmlDocument> {
        let mut reader = Reader::from_reader(self.input);
        reader.config_mut().check_end_names = true;
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| self.error(&reader, e.to_string()))?;
            let position = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
            self.advance_line(position);

            match event {
                Event::Start(ref start) => {
                    let id = self.open_element(start)?;
                    self.open.push(id);
                }
                Event::Empty(ref start) => {
                    self.open_element(start)?;
                    self.pop_scope();
                }
                Event::End(_) => {
                    if let Some(id) = self.open.pop() {
                        self.close_element(id);
                    }
                    self.pop_scope();
                }
                Event::Text(ref text) => {
                    let content = text
                        .unescape()
                        .map_err(|e| self.error(&reader, e.to_string()))?;
                    self.add_text(&content)?;
                }
                Event::CData(ref data) => {
                    let content = std::str::from_utf8(data)
                        .map_err(|e| self.error(&reader, e.to_string()))?
                        .to_string();
                    self.add_text(&content)?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !self.open.is_empty() {
            return Err(InventoryError::xml(format!(
                "line {}: unexpected end of document",
                self.line
            )));
        }
        if self.document.root.is_none() {
            return Err(InventoryError::xml("document has no root element"));
        }
        Ok(self.document)
    }

    fn error(&self, reader: &Reader<&[u8]>, message: String) -> InventoryError {
        let position = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
        let end = position.min(self.input.len());
        let line = 1 + self.input[..end].iter().filter(|&&b| b == b'\n').count();
        InventoryError::xml(format!("line {line}: {message}"))
    }

    fn advance_line(&mut self, position: usize) {
        let end = position.min(self.input.len());
        if end > self.counted_to {
            self.line += self.input[self.counted_to..end]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            self.counted_to = end;
        }
    }

    fn open_element(&mut self, start: &BytesStart<'_>) -> InventoryResult<NodeId> {
        if self.open.len() >= MAX_DEPTH {
            return Err(InventoryError::xml(format!(
                "line {}: elements nested deeper than {MAX_DEPTH} levels",
                self.line
            )));
        }
        let qname = utf8(start.name().as_ref(), self.line)?;
        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute
                .map_err(|e| InventoryError::xml(format!("line {}: {e}", self.line)))?;
            let key = utf8(attribute.key.as_ref(), self.line)?;
            let value = attribute
                .unescape_value()
                .map_err(|e| InventoryError::xml(format!("line {}: {e}", self.line)))?
                .into_owned();
            if key == "xmlns" {
                declarations.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((Some(prefix.to_string()), value));
            } else {
                raw_attributes.push((key, value));
            }
        }

        for (prefix, uri) in &declarations {
            self.bindings.entry(prefix.clone()).or_default().push(uri.clone());
        }
        self.declared
            .push(declarations.iter().map(|(prefix, _)| prefix.clone()).collect());

        let (prefix, name) = split_qname(&qname);
        let namespace = self.resolve(prefix.as_deref())?;
        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                let (prefix, name) = split_qname(&key);
                let namespace = match prefix.as_deref() {
                    None => None,
                    Some("xml") => Some("http://www.w3.org/XML/1998/namespace".to_string()),
                    Some(p) => self.resolve(Some(p))?,
                };
                Ok(Attribute {
                    name,
                    namespace,
                    value,
                })
            })
            .collect::<InventoryResult<Vec<_>>>()?;

        let id = self.document.push(
            NodeKind::Element(Element {
                name,
                prefix,
                namespace,
                attributes,
                declarations,
            }),
            self.line,
        );
        match self.open.last() {
            Some(&parent) => self.document.append_child(parent, id),
            None if self.document.root.is_none() => self.document.root = Some(id),
            None => {
                return Err(InventoryError::xml(format!(
                    "line {}: content after the root element",
                    self.line
                )))
            }
        }
        Ok(id)
    }

    /// Whitespace between child elements is formatting, not content.
    fn close_element(&mut self, id: NodeId) {
        let has_elements = self.document.element_children(id).next().is_some();
        if has_elements {
            let nodes = &self.document.nodes;
            let kept: Vec<NodeId> = nodes[id]
                .children
                .iter()
                .copied()
                .filter(|&child| match &nodes[child].kind {
                    NodeKind::Text(text) => !text.trim().is_empty(),
                    NodeKind::Element(_) => true,
                })
                .collect();
            self.document.nodes[id].children = kept;
        }
    }

    fn add_text(&mut self, content: &str) -> InventoryResult<()> {
        let Some(&parent) = self.open.last() else {
            if content.trim().is_empty() {
                return Ok(());
            }
            return Err(InventoryError::xml(format!(
                "line {}: text outside of the root element",
                self.line
            )));
        };
        // Merge with a preceding text node (text followed by CDATA).
        if let Some(&last) = self.document.nodes[parent].children.last() {
            if let NodeKind::Text(existing) = &mut self.document.nodes[last].kind {
                existing.push_str(content);
                return Ok(());
            }
        }
        let id = self.document.push(NodeKind::Text(content.to_string()), self.line);
        self.document.append_child(parent, id);
        Ok(())
    }

    fn pop_scope(&mut self) {
        for prefix in self.declared.pop().unwrap_or_default() {
            if let Some(uris) = self.bindings.get_mut(&prefix) {
                uris.pop();
            }
        }
    }

    fn resolve(&self, prefix: Option<&str>) -> InventoryResult<Option<String>> {
        let key = prefix.map(str::to_string);
        if let Some(uri) = self.bindings.get(&key).and_then(|uris| uris.last()) {
            return Ok((!uri.is_empty()).then(|| uri.clone()));
        }
        match prefix {
            None => Ok(None),
            Some(prefix) => Err(InventoryError::xml(format!(
                "line {}: undeclared namespace prefix {prefix}",
                self.line
            ))),
        }
    }
}

fn utf8(bytes: &[u8], line: usize) -> InventoryResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| InventoryError::xml(format!("line {line}: {e}")))
}

fn split_qname(qname: &str) -> (Option<String>, String) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix.to_string()), local.to_string()),
        None => (None, qname.to_string()),
    }
}
