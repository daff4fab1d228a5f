//! RELAX NG schema compilation and validation.
//!
//! Schemas in the XML syntax are compiled into a [`Pattern`] graph and
//! documents are checked with pattern derivatives: every start tag,
//! attribute, text node and end tag turns the current pattern into the
//! pattern that the rest of the document must match. A `NotAllowed`
//! derivative is a violation. The validator records a [`Diagnostic`] for it
//! and carries on with the last good pattern, so one pass reports every
//! independent problem in the document.
//!
//! The compiler accepts the subset the shipped schemas are written in:
//! `grammar`, `start`, `define`, `ref`, `element` and `attribute` with a
//! `name` attribute, `group`, `interleave`, `choice`, `optional`,
//! `zeroOrMore`, `oneOrMore`, `empty`, `text`, `value` and `data` with the
//! `string`, `token` and `integer` types and a `pattern` parameter.
//! Anything else is rejected when the schema is loaded.
//!
//! Diagnostics are returned by value, there is no shared error buffer.
//! Compiled schemas are immutable and cached per path in [`SchemaCache`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use regex::Regex;
use tracing::info;

use super::document::{NodeId, NodeKind, XmlDocument};
use crate::error::{Diagnostic, InventoryError, InventoryResult};

pub const RELAXNG_NS: &str = "http://relaxng.org/ns/structure/1.0";
pub const XSD_DATATYPES: &str = "http://www.w3.org/2001/XMLSchema-datatypes";

type P = Arc<Pattern>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datatype {
    String,
    Token,
    Integer,
}

impl Datatype {
    fn from_name(library: &str, name: &str) -> Option<Self> {
        match (library, name) {
            (_, "string") => Some(Datatype::String),
            (_, "token") => Some(Datatype::Token),
            (XSD_DATATYPES, "integer") => Some(Datatype::Integer),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Token => "token",
            Datatype::Integer => "integer",
        }
    }

    /// Value space representation used for comparisons.
    fn normalize(self, value: &str) -> String {
        match self {
            Datatype::String => value.to_string(),
            Datatype::Token | Datatype::Integer => value.split_whitespace().collect::<Vec<_>>().join(" "),
        }
    }

    fn allows(self, lexical: &str) -> bool {
        match self {
            Datatype::String | Datatype::Token => true,
            Datatype::Integer => {
                let digits = lexical.strip_prefix(['-', '+']).unwrap_or(lexical);
                !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
            }
        }
    }

    fn equal(self, expected: &str, actual: &str) -> bool {
        let (expected, actual) = (self.normalize(expected), self.normalize(actual));
        if self == Datatype::Integer && self.allows(&expected) && self.allows(&actual) {
            let canonical = |v: &str| {
                let (negative, digits) = match v.strip_prefix('-') {
                    Some(digits) => (true, digits),
                    None => (false, v.strip_prefix('+').unwrap_or(v)),
                };
                let digits = digits.trim_start_matches('0');
                (negative && !digits.is_empty(), digits.to_string())
            };
            return canonical(&expected) == canonical(&actual);
        }
        expected == actual
    }
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Empty,
    NotAllowed,
    Text,
    Choice(P, P),
    Interleave(P, P),
    Group(P, P),
    OneOrMore(P),
    Data {
        datatype: Datatype,
        pattern: Option<Regex>,
    },
    Value {
        datatype: Datatype,
        value: String,
    },
    /// Namespace URI (empty for none) and local name, then the value.
    Attribute(String, String, P),
    Element(String, String, P),
    /// Content still to match inside the current element, then the
    /// continuation after its end tag.
    After(P, P),
    /// Index into the schema's definitions.
    Ref(usize),
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        use Pattern::*;
        match (self, other) {
            (Empty, Empty) | (NotAllowed, NotAllowed) | (Text, Text) => true,
            (Choice(a, b), Choice(c, d))
            | (Interleave(a, b), Interleave(c, d))
            | (Group(a, b), Group(c, d))
            | (After(a, b), After(c, d)) => a == c && b == d,
            (OneOrMore(a), OneOrMore(b)) => a == b,
            (
                Data { datatype: a, pattern: p },
                Data { datatype: b, pattern: q },
            ) => a == b && p.as_ref().map(Regex::as_str) == q.as_ref().map(Regex::as_str),
            (Value { datatype: a, value: v }, Value { datatype: b, value: w }) => a == b && v == w,
            (Attribute(n, l, a), Attribute(m, k, b)) | (Element(n, l, a), Element(m, k, b)) => {
                n == m && l == k && a == b
            }
            (Ref(a), Ref(b)) => a == b,
            _ => false,
        }
    }
}

fn empty() -> P {
    Arc::new(Pattern::Empty)
}

fn not_allowed() -> P {
    Arc::new(Pattern::NotAllowed)
}

fn is_not_allowed(p: &Pattern) -> bool {
    matches!(p, Pattern::NotAllowed)
}

fn choice(a: P, b: P) -> P {
    if is_not_allowed(&a) {
        return b;
    }
    if is_not_allowed(&b) || a == b {
        return a;
    }
    if let Pattern::Choice(x, y) = &*a {
        if *x == b || *y == b {
            return a;
        }
    }
    if let Pattern::Choice(x, y) = &*b {
        if *x == a || *y == a {
            return b;
        }
    }
    Arc::new(Pattern::Choice(a, b))
}

fn group(a: P, b: P) -> P {
    if is_not_allowed(&a) || is_not_allowed(&b) {
        return not_allowed();
    }
    if matches!(*a, Pattern::Empty) {
        return b;
    }
    if matches!(*b, Pattern::Empty) {
        return a;
    }
    Arc::new(Pattern::Group(a, b))
}

fn interleave(a: P, b: P) -> P {
    if is_not_allowed(&a) || is_not_allowed(&b) {
        return not_allowed();
    }
    if matches!(*a, Pattern::Empty) {
        return b;
    }
    if matches!(*b, Pattern::Empty) {
        return a;
    }
    Arc::new(Pattern::Interleave(a, b))
}

fn after(a: P, b: P) -> P {
    if is_not_allowed(&a) || is_not_allowed(&b) {
        return not_allowed();
    }
    Arc::new(Pattern::After(a, b))
}

fn one_or_more(p: P) -> P {
    if is_not_allowed(&p) {
        return p;
    }
    Arc::new(Pattern::OneOrMore(p))
}

/// Compiled schema.
#[derive(Debug)]
pub struct Schema {
    start: P,
    defines: Vec<P>,
    define_names: Vec<String>,
}

impl Schema {
    /// Compile a schema from its XML syntax.
    pub fn parse(input: &[u8]) -> InventoryResult<Self> {
        let document = XmlDocument::parse(input)?;
        Compiler::new(&document).compile()
    }

    pub fn parse_str(input: &str) -> InventoryResult<Self> {
        Self::parse(input.as_bytes())
    }

    pub fn load(path: impl AsRef<Path>) -> InventoryResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            InventoryError::configuration(format!("cannot read schema {}: {e}", path.display()))
        })?;
        Self::parse(&bytes)
    }

    pub fn define_names(&self) -> &[String] {
        &self.define_names
    }

    /// Validate a whole document and return every violation found.
    pub fn validate(&self, document: &XmlDocument) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let Some(root) = document.root() else {
            diagnostics.push(Diagnostic {
                line: 0,
                message: "Document has no root element".to_string(),
            });
            return diagnostics;
        };
        let rest = self.validate_element(&self.start, document, root, &mut diagnostics);
        if diagnostics.is_empty() && !self.nullable(&rest) {
            diagnostics.push(Diagnostic {
                line: document.line(root),
                message: "Document is incomplete".to_string(),
            });
        }
        diagnostics
    }

    pub fn is_valid(&self, document: &XmlDocument) -> bool {
        self.validate(document).is_empty()
    }

    // Recursion follows document depth, which the parser caps.
    fn validate_element(
        &self,
        pattern: &P,
        document: &XmlDocument,
        id: NodeId,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> P {
        let Some(element) = document.element(id) else {
            return pattern.clone();
        };
        let line = document.line(id);
        let name = &element.name;
        let namespace = element.namespace.as_deref().unwrap_or_default();
        let mut report = |message: String| diagnostics.push(Diagnostic { line, message });

        let opened = self.start_tag_open_deriv(pattern, namespace, name);
        if is_not_allowed(&opened) {
            report(format!("Did not expect element {name} there"));
            return pattern.clone();
        }

        let mut current = opened;
        for attribute in &element.attributes {
            let attribute_ns = attribute.namespace.as_deref().unwrap_or_default();
            let next = self.att_deriv(&current, attribute_ns, &attribute.name, &attribute.value);
            if is_not_allowed(&next) {
                report(format!("Invalid attribute {} for element {name}", attribute.name));
            } else {
                current = next;
            }
        }

        let closed = self.start_tag_close_deriv(&current, false);
        current = if is_not_allowed(&closed) {
            report(format!("Element {name} failed to validate attributes"));
            self.start_tag_close_deriv(&current, true)
        } else {
            closed
        };

        let children = document.children(id);
        let mut content_reported = false;
        if children.is_empty() {
            current = choice(current.clone(), self.text_deriv(&current, ""));
        } else {
            let has_elements = document.element_children(id).next().is_some();
            for &child in children {
                match &document.node(child).kind {
                    NodeKind::Element(_) => {
                        current = self.validate_element(&current, document, child, diagnostics);
                    }
                    NodeKind::Text(text) => {
                        let blank = text.trim().is_empty();
                        if blank && has_elements {
                            continue;
                        }
                        let mut next = self.text_deriv(&current, text);
                        if blank {
                            next = choice(current.clone(), next);
                        }
                        if is_not_allowed(&next) {
                            let message = match self.find_datatype(&current, 0) {
                                Some(datatype) => format!(
                                    "Element {name}: value '{}' is not a valid {}",
                                    text.trim(),
                                    datatype.name()
                                ),
                                None => format!("Element {name} has extra content: text"),
                            };
                            diagnostics.push(Diagnostic { line, message });
                            content_reported = true;
                        } else {
                            current = next;
                        }
                    }
                }
            }
        }

        let ended = self.end_tag_deriv(&current);
        if is_not_allowed(&ended) {
            if !content_reported {
                diagnostics.push(Diagnostic {
                    line,
                    message: format!("Element {name} failed to validate content"),
                });
            }
            return self.after_tail(&current);
        }
        ended
    }

    fn deref(&self, index: usize) -> &P {
        &self.defines[index]
    }

    fn nullable(&self, p: &P) -> bool {
        match &**p {
            Pattern::Group(a, b) | Pattern::Interleave(a, b) => self.nullable(a) && self.nullable(b),
            Pattern::Choice(a, b) => self.nullable(a) || self.nullable(b),
            Pattern::OneOrMore(a) => self.nullable(a),
            Pattern::Empty | Pattern::Text => true,
            Pattern::Ref(i) => self.nullable(self.deref(*i)),
            _ => false,
        }
    }

    fn apply_after(&self, p: &P, f: &dyn Fn(P) -> P) -> P {
        match &**p {
            Pattern::After(a, b) => after(a.clone(), f(b.clone())),
            Pattern::Choice(a, b) => choice(self.apply_after(a, f), self.apply_after(b, f)),
            _ => not_allowed(),
        }
    }

    fn start_tag_open_deriv(&self, p: &P, namespace: &str, name: &str) -> P {
        match &**p {
            Pattern::Choice(a, b) => choice(
                self.start_tag_open_deriv(a, namespace, name),
                self.start_tag_open_deriv(b, namespace, name),
            ),
            Pattern::Element(ns, local, content) if ns == namespace && local == name => {
                after(content.clone(), empty())
            }
            Pattern::Interleave(a, b) => {
                let left = self.apply_after(&self.start_tag_open_deriv(a, namespace, name), &|x| {
                    interleave(x, b.clone())
                });
                let right = self.apply_after(&self.start_tag_open_deriv(b, namespace, name), &|x| {
                    interleave(a.clone(), x)
                });
                choice(left, right)
            }
            Pattern::OneOrMore(a) => {
                let repeat = choice(p.clone(), empty());
                self.apply_after(&self.start_tag_open_deriv(a, namespace, name), &|x| {
                    group(x, repeat.clone())
                })
            }
            Pattern::Group(a, b) => {
                let first = self.apply_after(&self.start_tag_open_deriv(a, namespace, name), &|x| {
                    group(x, b.clone())
                });
                if self.nullable(a) {
                    choice(first, self.start_tag_open_deriv(b, namespace, name))
                } else {
                    first
                }
            }
            Pattern::After(a, b) => self
                .apply_after(&self.start_tag_open_deriv(a, namespace, name), &|x| after(x, b.clone())),
            Pattern::Ref(i) => self.start_tag_open_deriv(self.deref(*i), namespace, name),
            _ => not_allowed(),
        }
    }

    fn att_deriv(&self, p: &P, namespace: &str, name: &str, value: &str) -> P {
        match &**p {
            Pattern::After(a, b) => after(self.att_deriv(a, namespace, name, value), b.clone()),
            Pattern::Choice(a, b) => choice(
                self.att_deriv(a, namespace, name, value),
                self.att_deriv(b, namespace, name, value),
            ),
            Pattern::Group(a, b) => choice(
                group(self.att_deriv(a, namespace, name, value), b.clone()),
                group(a.clone(), self.att_deriv(b, namespace, name, value)),
            ),
            Pattern::Interleave(a, b) => choice(
                interleave(self.att_deriv(a, namespace, name, value), b.clone()),
                interleave(a.clone(), self.att_deriv(b, namespace, name, value)),
            ),
            Pattern::OneOrMore(a) => group(
                self.att_deriv(a, namespace, name, value),
                choice(p.clone(), empty()),
            ),
            Pattern::Attribute(ns, local, content)
                if ns == namespace && local == name && self.value_match(content, value) =>
            {
                empty()
            }
            Pattern::Ref(i) => self.att_deriv(self.deref(*i), namespace, name, value),
            _ => not_allowed(),
        }
    }

    /// With `lenient` set, missing attributes are forgiven so that content
    /// validation can go on after an attribute error has been reported.
    fn start_tag_close_deriv(&self, p: &P, lenient: bool) -> P {
        match &**p {
            Pattern::After(a, b) => after(self.start_tag_close_deriv(a, lenient), b.clone()),
            Pattern::Choice(a, b) => choice(
                self.start_tag_close_deriv(a, lenient),
                self.start_tag_close_deriv(b, lenient),
            ),
            Pattern::Group(a, b) => group(
                self.start_tag_close_deriv(a, lenient),
                self.start_tag_close_deriv(b, lenient),
            ),
            Pattern::Interleave(a, b) => interleave(
                self.start_tag_close_deriv(a, lenient),
                self.start_tag_close_deriv(b, lenient),
            ),
            Pattern::OneOrMore(a) => one_or_more(self.start_tag_close_deriv(a, lenient)),
            Pattern::Attribute(..) if lenient => empty(),
            Pattern::Attribute(..) => not_allowed(),
            Pattern::Ref(i) if self.has_attribute(self.deref(*i), 0) => {
                self.start_tag_close_deriv(self.deref(*i), lenient)
            }
            _ => p.clone(),
        }
    }

    /// Whether attribute patterns are reachable without entering an element.
    fn has_attribute(&self, p: &P, depth: usize) -> bool {
        if depth > self.defines.len() {
            return false;
        }
        match &**p {
            Pattern::Attribute(..) => true,
            Pattern::Choice(a, b) | Pattern::Group(a, b) | Pattern::Interleave(a, b) => {
                self.has_attribute(a, depth) || self.has_attribute(b, depth)
            }
            Pattern::OneOrMore(a) => self.has_attribute(a, depth),
            Pattern::Ref(i) => self.has_attribute(self.deref(*i), depth + 1),
            _ => false,
        }
    }

    fn text_deriv(&self, p: &P, text: &str) -> P {
        match &**p {
            Pattern::Choice(a, b) => choice(self.text_deriv(a, text), self.text_deriv(b, text)),
            Pattern::Interleave(a, b) => choice(
                interleave(self.text_deriv(a, text), b.clone()),
                interleave(a.clone(), self.text_deriv(b, text)),
            ),
            Pattern::Group(a, b) => {
                let first = group(self.text_deriv(a, text), b.clone());
                if self.nullable(a) {
                    choice(first, self.text_deriv(b, text))
                } else {
                    first
                }
            }
            Pattern::After(a, b) => after(self.text_deriv(a, text), b.clone()),
            Pattern::OneOrMore(a) => group(self.text_deriv(a, text), choice(p.clone(), empty())),
            Pattern::Text => p.clone(),
            Pattern::Value { datatype, value } => {
                if datatype.equal(value, text) {
                    empty()
                } else {
                    not_allowed()
                }
            }
            Pattern::Data { datatype, pattern } => {
                let lexical = datatype.normalize(text);
                let allowed = datatype.allows(&lexical)
                    && pattern.as_ref().map_or(true, |regex| regex.is_match(&lexical));
                if allowed {
                    empty()
                } else {
                    not_allowed()
                }
            }
            Pattern::Ref(i) => self.text_deriv(self.deref(*i), text),
            _ => not_allowed(),
        }
    }

    fn value_match(&self, p: &P, text: &str) -> bool {
        (self.nullable(p) && text.trim().is_empty()) || self.nullable(&self.text_deriv(p, text))
    }

    fn end_tag_deriv(&self, p: &P) -> P {
        match &**p {
            Pattern::Choice(a, b) => choice(self.end_tag_deriv(a), self.end_tag_deriv(b)),
            Pattern::After(a, b) if self.nullable(a) => b.clone(),
            _ => not_allowed(),
        }
    }

    /// Continuation after the current element, whatever its content.
    fn after_tail(&self, p: &P) -> P {
        match &**p {
            Pattern::After(_, b) => b.clone(),
            Pattern::Choice(a, b) => choice(self.after_tail(a), self.after_tail(b)),
            _ => not_allowed(),
        }
    }

    /// Datatype the current content expects, if any.
    fn find_datatype(&self, p: &P, depth: usize) -> Option<Datatype> {
        if depth > self.defines.len() {
            return None;
        }
        match &**p {
            Pattern::Data { datatype, .. } | Pattern::Value { datatype, .. } => Some(*datatype),
            Pattern::After(a, _) | Pattern::OneOrMore(a) => self.find_datatype(a, depth),
            Pattern::Choice(a, b) | Pattern::Group(a, b) | Pattern::Interleave(a, b) => self
                .find_datatype(a, depth)
                .or_else(|| self.find_datatype(b, depth)),
            Pattern::Ref(i) => self.find_datatype(self.deref(*i), depth + 1),
            _ => None,
        }
    }
}

struct Compiler<'d> {
    document: &'d XmlDocument,
    define_index: HashMap<String, usize>,
    define_names: Vec<String>,
}

fn schema_error(message: impl fmt::Display) -> InventoryError {
    InventoryError::configuration(format!("invalid RELAX NG schema: {message}"))
}

impl<'d> Compiler<'d> {
    fn new(document: &'d XmlDocument) -> Self {
        Self {
            document,
            define_index: HashMap::new(),
            define_names: Vec::new(),
        }
    }

    fn compile(mut self) -> InventoryResult<Schema> {
        let root = self
            .document
            .root()
            .ok_or_else(|| schema_error("empty document"))?;
        let library = self.document.attribute(root, "datatypeLibrary").unwrap_or_default();

        if self.local_name(root) != Some("grammar") {
            let start = self.pattern(root, library)?;
            return Ok(Schema {
                start,
                defines: Vec::new(),
                define_names: Vec::new(),
            });
        }

        let mut starts = Vec::new();
        let mut defines = Vec::new();
        for child in self.rng_children(root) {
            match self.local_name(child) {
                Some("start") => starts.push(child),
                Some("define") => defines.push(child),
                other => {
                    return Err(schema_error(format!(
                        "unsupported grammar content: {}",
                        other.unwrap_or_default()
                    )))
                }
            }
        }

        for &id in &defines {
            let name = self.required_attribute(id, "name")?;
            if self.define_index.contains_key(&name) {
                return Err(schema_error(format!("{name} is defined more than once")));
            }
            self.define_index.insert(name.clone(), self.define_names.len());
            self.define_names.push(name);
        }

        let mut compiled = Vec::with_capacity(defines.len());
        for &id in &defines {
            compiled.push(self.group_of(id, self.library(id, library))?);
        }

        let start = match starts.as_slice() {
            [id] => self.group_of(*id, self.library(*id, library))?,
            [] => return Err(schema_error("grammar has no start")),
            _ => return Err(schema_error("grammar has more than one start")),
        };

        let schema = Schema {
            start,
            defines: compiled,
            define_names: self.define_names,
        };
        check_recursion(&schema)?;
        Ok(schema)
    }

    fn local_name(&self, id: NodeId) -> Option<&'d str> {
        self.document.name(id)
    }

    /// Datatype library in scope for `id`.
    fn library<'a>(&'a self, id: NodeId, inherited: &'a str) -> &'a str {
        self.document.attribute(id, "datatypeLibrary").unwrap_or(inherited)
    }

    fn rng_children(&self, id: NodeId) -> Vec<NodeId> {
        self.document
            .element_children(id)
            .filter(|&child| {
                self.document
                    .element(child)
                    .is_some_and(|e| e.namespace.as_deref() == Some(RELAXNG_NS))
            })
            .collect()
    }

    fn required_attribute(&self, id: NodeId, name: &str) -> InventoryResult<String> {
        self.document
            .attribute(id, name)
            .map(|v| v.trim().to_string())
            .ok_or_else(|| {
                schema_error(format!(
                    "line {}: {} requires a {name} attribute",
                    self.document.line(id),
                    self.local_name(id).unwrap_or_default()
                ))
            })
    }

    fn group_of(&self, id: NodeId, library: &str) -> InventoryResult<P> {
        let mut result = empty();
        for child in self.rng_children(id) {
            result = group(result, self.pattern(child, library)?);
        }
        Ok(result)
    }

    fn pattern(&self, id: NodeId, inherited: &str) -> InventoryResult<P> {
        let library = self.library(id, inherited);
        let name = self.local_name(id).unwrap_or_default();
        let pattern = match name {
            "element" | "attribute" => {
                let qname = self.required_attribute(id, "name")?;
                let local = qname.rsplit(':').next().unwrap_or_default().to_string();
                let namespace = self.document.attribute(id, "ns").unwrap_or_default().to_string();
                if name == "element" {
                    Arc::new(Pattern::Element(namespace, local, self.group_of(id, library)?))
                } else {
                    let content = if self.rng_children(id).is_empty() {
                        Arc::new(Pattern::Text)
                    } else {
                        self.group_of(id, library)?
                    };
                    Arc::new(Pattern::Attribute(namespace, local, content))
                }
            }
            "group" => self.group_of(id, library)?,
            "interleave" => self
                .rng_children(id)
                .into_iter()
                .try_fold(empty(), |acc, child| {
                    Ok::<_, InventoryError>(interleave(acc, self.pattern(child, library)?))
                })?,
            "choice" => self
                .rng_children(id)
                .into_iter()
                .try_fold(not_allowed(), |acc, child| {
                    Ok::<_, InventoryError>(choice(acc, self.pattern(child, library)?))
                })?,
            "optional" => choice(self.group_of(id, library)?, empty()),
            "zeroOrMore" => choice(one_or_more(self.group_of(id, library)?), empty()),
            "oneOrMore" => one_or_more(self.group_of(id, library)?),
            "ref" => {
                let target = self.required_attribute(id, "name")?;
                let index = self.define_index.get(&target).ok_or_else(|| {
                    schema_error(format!("reference to undefined pattern {target}"))
                })?;
                Arc::new(Pattern::Ref(*index))
            }
            "empty" => empty(),
            "text" => Arc::new(Pattern::Text),
            "value" => {
                let datatype = match self.document.attribute(id, "type") {
                    Some(type_name) => self.datatype(id, library, type_name)?,
                    None => Datatype::Token,
                };
                Arc::new(Pattern::Value {
                    datatype,
                    value: self.document.text_content(id),
                })
            }
            "data" => {
                let type_name = self.required_attribute(id, "type")?;
                let datatype = self.datatype(id, library, &type_name)?;
                let mut pattern = None;
                for child in self.rng_children(id) {
                    let param = self.required_attribute(child, "name")?;
                    if self.local_name(child) != Some("param") || param != "pattern" {
                        return Err(schema_error(format!(
                            "line {}: unsupported datatype parameter {param}",
                            self.document.line(child)
                        )));
                    }
                    let value = self.document.text_content(child);
                    let regex = Regex::new(&format!("^(?:{})$", value.trim()))
                        .map_err(|e| schema_error(format!("invalid pattern {value}: {e}")))?;
                    pattern = Some(regex);
                }
                Arc::new(Pattern::Data { datatype, pattern })
            }
            other => {
                return Err(schema_error(format!(
                    "line {}: unsupported pattern {other}",
                    self.document.line(id)
                )))
            }
        };
        Ok(pattern)
    }

    fn datatype(&self, id: NodeId, library: &str, type_name: &str) -> InventoryResult<Datatype> {
        Datatype::from_name(library, type_name.trim()).ok_or_else(|| {
            schema_error(format!(
                "line {}: unsupported datatype {type_name}",
                self.document.line(id)
            ))
        })
    }
}

/// Reject definitions that refer to themselves without an element in
/// between. Derivatives of such patterns would not terminate.
fn check_recursion(schema: &Schema) -> InventoryResult<()> {
    fn visit(schema: &Schema, p: &P, path: &mut Vec<usize>) -> InventoryResult<()> {
        match &**p {
            Pattern::Ref(i) => {
                if path.contains(i) {
                    return Err(schema_error(format!(
                        "recursive reference to {} outside of an element",
                        schema.define_names[*i]
                    )));
                }
                path.push(*i);
                visit(schema, &schema.defines[*i], path)?;
                path.pop();
                Ok(())
            }
            Pattern::Choice(a, b) | Pattern::Group(a, b) | Pattern::Interleave(a, b) => {
                visit(schema, a, path)?;
                visit(schema, b, path)
            }
            Pattern::OneOrMore(a) | Pattern::Attribute(_, _, a) => visit(schema, a, path),
            _ => Ok(()),
        }
    }

    let mut path = Vec::new();
    visit(schema, &schema.start, &mut path)?;
    for index in 0..schema.defines.len() {
        path.clear();
        path.push(index);
        visit(schema, &schema.defines[index], &mut path)?;
    }
    Ok(())
}

/// Compiled schemas keyed by path, shared across threads.
#[derive(Debug, Default)]
pub struct SchemaCache {
    schemas: DashMap<PathBuf, Arc<Schema>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process wide cache used by the document types.
    pub fn global() -> &'static SchemaCache {
        static CACHE: OnceLock<SchemaCache> = OnceLock::new();
        CACHE.get_or_init(SchemaCache::new)
    }

    pub fn load(&self, path: &Path) -> InventoryResult<Arc<Schema>> {
        if let Some(schema) = self.schemas.get(path) {
            return Ok(Arc::clone(schema.value()));
        }
        let schema = Arc::new(Schema::load(path)?);
        info!(
            schema = %path.display(),
            definitions = schema.define_names.len(),
            "Compiled RELAX NG schema"
        );
        self.schemas.insert(path.to_path_buf(), Arc::clone(&schema));
        Ok(schema)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn clear(&self) {
        self.schemas.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS_BOOK: &str = r#"
        <grammar xmlns="http://relaxng.org/ns/structure/1.0"
                 datatypeLibrary="http://www.w3.org/2001/XMLSchema-datatypes">
          <start>
            <element name="book">
              <zeroOrMore><ref name="card"/></zeroOrMore>
            </element>
          </start>
          <define name="card">
            <element name="card">
              <attribute name="id"><data type="integer"/></attribute>
              <optional><attribute name="kind"><choice><value>home</value><value>work</value></choice></attribute></optional>
              <interleave>
                <element name="name"><text/></element>
                <element name="email"><data type="string"><param name="pattern">[^@]+@[^@]+</param></data></element>
                <optional><element name="age"><data type="integer"/></element></optional>
              </interleave>
            </element>
          </define>
        </grammar>"#;

    fn diagnostics(schema: &Schema, xml: &str) -> Vec<String> {
        let document = XmlDocument::parse_str(xml).unwrap();
        schema
            .validate(&document)
            .into_iter()
            .map(|d| d.to_string())
            .collect()
    }

    #[test]
    fn test_valid_documents() {
        let schema = Schema::parse_str(ADDRESS_BOOK).unwrap();
        assert!(diagnostics(&schema, "<book/>").is_empty());
        assert!(diagnostics(
            &schema,
            r#"<book>
                 <card id="1" kind="work"><email>a@b</email><name>A</name></card>
                 <card id="2"><name>B</name><age> 42 </age><email>b@c</email></card>
               </book>"#
        )
        .is_empty());
    }

    #[test]
    fn test_reports_every_violation_with_lines() {
        let schema = Schema::parse_str(ADDRESS_BOOK).unwrap();
        let found = diagnostics(
            &schema,
            "<book>\n<card id=\"x\"><name>A</name><email>x</email></card>\n<note/>\n<card id=\"3\"><name>C</name></card>\n</book>",
        );
        assert_eq!(
            found,
            vec![
                "line 2: Invalid attribute id for element card",
                "line 2: Element card failed to validate attributes",
                "line 2: Element email: value 'x' is not a valid string",
                "line 3: Did not expect element note there",
                "line 4: Element card failed to validate content",
            ]
        );
    }

    #[test]
    fn test_unexpected_root() {
        let schema = Schema::parse_str(ADDRESS_BOOK).unwrap();
        assert_eq!(
            diagnostics(&schema, "<card/>"),
            vec!["line 1: Did not expect element card there"]
        );
    }

    #[test]
    fn test_text_in_element_only_content() {
        let schema = Schema::parse_str(ADDRESS_BOOK).unwrap();
        assert_eq!(
            diagnostics(&schema, "<book>stray</book>"),
            vec!["line 1: Element book has extra content: text"]
        );
    }

    #[test]
    fn test_simple_element_schema() {
        let schema = Schema::parse_str(
            r#"<element name="v" xmlns="http://relaxng.org/ns/structure/1.0"
                        datatypeLibrary="http://www.w3.org/2001/XMLSchema-datatypes">
                 <value type="integer">7</value>
               </element>"#,
        )
        .unwrap();
        assert!(diagnostics(&schema, "<v>007</v>").is_empty());
        assert!(diagnostics(&schema, "<v>+7</v>").is_empty());
        assert_eq!(diagnostics(&schema, "<v>8</v>"), vec!["line 1: Element v: value '8' is not a valid integer"]);
        assert_eq!(diagnostics(&schema, "<v/>").len(), 1);
    }

    #[test]
    fn test_schema_errors() {
        let undefined = r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
              <start><ref name="missing"/></start></grammar>"#;
        assert!(matches!(
            Schema::parse_str(undefined),
            Err(InventoryError::Configuration(_))
        ));
        let recursive = r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0">
              <start><ref name="a"/></start>
              <define name="a"><choice><empty/><group><text/><ref name="a"/></group></choice></define>
            </grammar>"#;
        assert!(Schema::parse_str(recursive).is_err());
    }

    #[test]
    fn test_unsupported_constructs_are_rejected() {
        for body in [
            "<element><anyName/><empty/></element>",
            "<element name=\"a\"><list><text/></list></element>",
            "<element name=\"a\"><data type=\"date\"/></element>",
            "<element name=\"a\"><data type=\"string\"><param name=\"maxLength\">3</param></data></element>",
        ] {
            let schema = format!(
                r#"<grammar xmlns="http://relaxng.org/ns/structure/1.0"
                            datatypeLibrary="http://www.w3.org/2001/XMLSchema-datatypes">
                     <start>{body}</start></grammar>"#
            );
            assert!(
                matches!(Schema::parse_str(&schema), Err(InventoryError::Configuration(_))),
                "{body}"
            );
        }
    }

    #[test]
    fn test_datatypes() {
        assert!(Datatype::Integer.allows(&Datatype::Integer.normalize(" -42 ")));
        assert!(!Datatype::Integer.allows("4.2"));
        assert!(!Datatype::Integer.allows(""));
        assert!(Datatype::Integer.equal("007", "7"));
        assert!(Datatype::Integer.equal("-0", "0"));
        assert!(Datatype::Token.equal("INVENTORY", " INVENTORY\n"));
        assert!(!Datatype::String.equal("INVENTORY", " INVENTORY"));
    }

    #[test]
    fn test_shipped_schema_compiles() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas/InventoryRequest.rng");
        let schema = Schema::load(path).unwrap();
        assert!(schema.define_names().iter().any(|name| name == "content"));
    }

    #[test]
    fn test_schema_cache_compiles_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.rng");
        std::fs::write(&path, ADDRESS_BOOK).unwrap();
        let cache = SchemaCache::new();
        let first = cache.load(&path).unwrap();
        let second = cache.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert!(cache.load(&dir.path().join("missing.rng")).is_err());
    }
}
