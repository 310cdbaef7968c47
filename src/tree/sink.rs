use ego_tree::NodeId;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};

use super::{
    node::{Element, Node},
    Tree,
};

/// Builds a [`Tree`] from the events of a strict XML reader.
///
/// Parsing stops at the first well-formedness error. The error is recorded in
/// [`Tree::errors`] and the nodes built so far are kept.
#[derive(Debug)]
pub struct XmlTreeSink {
    tree: Tree,
    open_elements: Vec<NodeId>,
}

impl XmlTreeSink {
    pub fn new() -> Self {
        let tree = Tree::new();
        let root = tree.root();
        Self {
            tree,
            open_elements: vec![root],
        }
    }

    pub fn process(&mut self, xml: &str) {
        let mut reader = Reader::from_str(xml);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = true;
        config.expand_empty_elements = false;

        loop {
            let res = match reader.read_event() {
                Ok(Event::Start(start)) => self.start_element(&start, false),
                Ok(Event::Empty(start)) => self.start_element(&start, true),
                Ok(Event::End(_)) => {
                    // The reader already verified that the end tag matches
                    self.open_elements.pop();
                    Ok(())
                }
                Ok(Event::Text(text)) => match text.unescape() {
                    Ok(text) => {
                        self.append_text(&text);
                        Ok(())
                    }
                    Err(err) => Err(err.to_string()),
                },
                Ok(Event::CData(data)) => {
                    self.append_text(&String::from_utf8_lossy(&data.into_inner()));
                    Ok(())
                }
                Ok(Event::Comment(comment)) => {
                    let comment = String::from_utf8_lossy(&comment.into_inner()).into_owned();
                    self.append(Node::Comment(comment));
                    Ok(())
                }
                Ok(Event::Decl(_) | Event::PI(_) | Event::DocType(_)) => Ok(()),
                Ok(Event::Eof) => break,
                Err(err) => Err(format!(
                    "XML parse error at position {}: {err}",
                    reader.error_position()
                )),
            };
            if let Err(err) = res {
                self.parse_error(err);
                return;
            }
        }

        if let [_, .., last] = self.open_elements[..] {
            let name = self
                .tree
                .element(last)
                .map_or("", |element| element.name.as_str())
                .to_owned();
            self.parse_error(format!("unclosed element <{name}> at end of input"));
        }
    }

    pub fn finish(self) -> Tree {
        self.tree
    }

    fn parse_error(&mut self, msg: String) {
        log::debug!("{msg}");
        self.tree.errors.push(msg);
    }

    fn current(&self) -> NodeId {
        // The document root is never popped
        *self.open_elements.last().unwrap_or(&self.tree.root())
    }

    fn append(&mut self, node: Node) -> NodeId {
        let parent = self.current();
        self.tree.node_mut(parent).append(node).id()
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        let mut parent = self.tree.node_mut(parent);
        if let Some(mut last) = parent.last_child() {
            if let Node::Text(t) = last.value() {
                t.push_str(text);
                return;
            }
        }
        parent.append(Node::Text(text.to_owned()));
    }

    fn start_element(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<(), String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut element = Element::new(name);
        for attr in start.attributes() {
            let attr = attr.map_err(|err| err.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|err| err.to_string())?;
            element.attrs.set(&key, value.into_owned());
        }
        let id = self.append(Node::Element(element));
        if !empty {
            self.open_elements.push(id);
        }
        Ok(())
    }
}

impl Default for XmlTreeSink {
    fn default() -> Self {
        Self::new()
    }
}
