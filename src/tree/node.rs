use std::fmt;

use indexmap::IndexMap;

/// A node in the tree.
#[derive(Clone, PartialEq, Eq)]
pub enum Node {
    /// The tree root. Never serialized.
    Document,

    /// An XML comment.
    Comment(String),

    /// Character data.
    Text(String),

    /// An element.
    Element(Element),
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub id: Option<String>,
    pub classes: String,
    pub rest: IndexMap<String, String>,
}

/// An element: its (possibly prefixed) name and its attributes.
#[derive(Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Attributes,
}

impl Node {
    pub fn element(&self) -> Option<&Element> {
        match self {
            Node::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, name: &str) -> bool {
        matches!(self, Node::Element(element) if element.name == name)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Attributes::default(),
        }
    }

    pub fn with_attrs<'a>(
        name: impl Into<String>,
        attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut element = Self::new(name);
        for (name, value) in attrs {
            element.attrs.set(name, value);
        }
        element
    }

    /// The level of an `h1`–`h9` heading.
    pub fn heading_level(&self) -> Option<usize> {
        match self.name.as_bytes() {
            [b'h' | b'H', level @ b'1'..=b'9'] => Some(usize::from(level - b'0')),
            _ => None,
        }
    }

    /// Is this the name of a [void element](https://developer.mozilla.org/en-US/docs/Glossary/Void_element)?
    pub fn is_void_element(&self) -> bool {
        matches!(
            self.name.as_str(),
            "area"
                | "base"
                | "basefont"
                | "bgsound"
                | "br"
                | "col"
                | "embed"
                | "frame"
                | "hr"
                | "img"
                | "input"
                | "keygen"
                | "link"
                | "meta"
                | "param"
                | "source"
                | "track"
                | "wbr"
        )
    }

    /// Elements whose content is serialized with XML rules rather than HTML ones.
    pub fn is_foreign(&self) -> bool {
        matches!(self.name.as_str(), "svg" | "math")
    }
}

impl Attributes {
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "class" => (!self.classes.is_empty()).then_some(self.classes.as_str()),
            name => self.rest.get(name).map(String::as_str),
        }
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        match name {
            "id" => self.id = Some(value.into()),
            "class" => self.classes = value.into(),
            name => {
                self.rest.insert(name.into(), value.into());
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.take(),
            "class" => Some(std::mem::take(&mut self.classes)).filter(|c| !c.is_empty()),
            name => self.rest.shift_remove(name),
        }
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.split_ascii_whitespace().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        if !self.classes.is_empty() {
            self.classes.push(' ');
        }
        self.classes.push_str(class);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        (self.id.as_deref().map(|id| ("id", id)).into_iter())
            .chain((!self.classes.is_empty()).then_some(("class", self.classes.as_str())))
            .chain(self.rest.iter().map(|(name, value)| (name.as_str(), value.as_str())))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Document => write!(f, "Document"),
            Node::Comment(comment) => write!(f, "<!--{comment}-->"),
            Node::Text(text) => write!(f, "Text({text:?})"),
            Node::Element(element) => write!(f, "{element:?}"),
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "<{}", self.name)?;
        for (name, value) in self.attrs.iter() {
            write!(f, r#" {name}="{value}""#)?;
        }
        write!(f, ">")
    }
}
