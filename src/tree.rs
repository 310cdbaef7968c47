use std::fmt::Write as _;

use ego_tree::{NodeId, NodeMut, NodeRef};
use quick_xml::escape::{escape, partial_escape};
use tracing::trace;

mod node;
pub use node::{Element, Node};

mod sink;
use sink::XmlTreeSink;

/// A mutable document tree.
///
/// The root node is always [`Node::Document`]. [`NodeId`]s stay valid while
/// nodes are detached and re-inserted, so passes refer to nodes by id.
#[derive(Debug, Clone)]
pub struct Tree {
    errors: Vec<String>,
    tree: ego_tree::Tree<Node>,
}

/// Whether [`Tree::for_each_preorder`] should descend into a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Children,
    SkipChildren,
}

impl Tree {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            tree: ego_tree::Tree::new(Node::Document),
        }
    }

    /// Parses strict XML. Multiple top-level nodes are allowed, which makes this
    /// usable for fragments as well as documents.
    pub fn parse(xml: &str) -> Self {
        let mut sink = XmlTreeSink::new();
        sink.process(xml);
        sink.finish()
    }

    /// Well-formedness errors encountered while parsing.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_, Node> {
        // Ids are only ever obtained from this tree
        self.tree.get(id).unwrap()
    }

    pub fn node_mut(&mut self, id: NodeId) -> NodeMut<'_, Node> {
        self.tree.get_mut(id).unwrap()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node(id).value().element()
    }

    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.node(id).value().is_element(name)
    }

    pub fn with_element_mut<R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Element) -> R,
    ) -> Option<R> {
        match self.node_mut(id).value() {
            Node::Element(element) => Some(f(element)),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        self.with_element_mut(id, |element| element.attrs.set(name, value));
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.with_element_mut(id, |element| element.attrs.remove(name))
            .flatten()
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        self.with_element_mut(id, |element| element.attrs.add_class(class));
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.attrs.has_class(class))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent().map(|node| node.id())
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .parent()
            .filter(|parent| parent.value().element().is_some())
            .map(|parent| parent.id())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child().map(|node| node.id())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling().map(|node| node.id())
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children().map(|node| node.id()).collect()
    }

    /// The first element child, skipping text and comments.
    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)
            .children()
            .find(|child| child.value().element().is_some())
            .map(|child| child.id())
    }

    /// The first descendant (excluding `id` itself) named `name`, in document order.
    pub fn first_descendant(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.node(id)
            .descendants()
            .skip(1)
            .find(|node| node.value().is_element(name))
            .map(|node| node.id())
    }

    /// Snapshot of all elements below (and including) `id` in preorder.
    pub fn elements_preorder(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .descendants()
            .filter(|node| node.value().element().is_some())
            .map(|node| node.id())
            .collect()
    }

    /// Concatenated character data of all descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        self.node(id)
            .descendants()
            .filter_map(|node| node.value().as_text())
            .collect()
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.tree.orphan(Node::Element(element)).id()
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.tree.orphan(Node::Text(text.into())).id()
    }

    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).append_id(child);
    }

    pub fn prepend(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(parent).prepend_id(child);
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        self.node_mut(sibling).insert_id_before(node);
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        self.node_mut(sibling).insert_id_after(node);
    }

    /// Inserts `node` into `parent` before `before`, or at the end when `before` is `None`.
    pub fn insert_into(&mut self, parent: NodeId, node: NodeId, before: Option<NodeId>) {
        match before {
            Some(before) => self.insert_before(before, node),
            None => self.append(parent, node),
        }
    }

    pub fn detach(&mut self, id: NodeId) {
        self.node_mut(id).detach();
    }

    /// Replaces `old` with `new` at the same position.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.insert_before(old, new);
        self.detach(old);
    }

    pub fn remove_children(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.detach(child);
        }
    }

    /// Moves all children of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        for child in self.children(from) {
            self.append(to, child);
        }
    }

    /// Moves all children of `id` into a new `wrapper` element, which becomes `id`'s
    /// only child.
    pub fn wrap_children(&mut self, id: NodeId, wrapper: Element) -> NodeId {
        let wrapper = self.create_element(wrapper);
        self.move_children(id, wrapper);
        self.append(id, wrapper);
        wrapper
    }

    /// Puts `id` inside a new `wrapper` element at `id`'s position.
    pub fn wrap(&mut self, id: NodeId, wrapper: Element) -> NodeId {
        let wrapper = self.create_element(wrapper);
        self.insert_before(id, wrapper);
        self.append(wrapper, id);
        wrapper
    }

    /// Deep-copies `id` into a new orphan subtree.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let value = self.node(id).value().clone();
        let copy = self.tree.orphan(value).id();
        for child in self.children(id) {
            let child = self.deep_clone(child);
            self.append(copy, child);
        }
        copy
    }

    /// Deep-copies a node of another tree into an orphan subtree of this one.
    pub fn import(&mut self, node: NodeRef<'_, Node>) -> NodeId {
        let copy = self.tree.orphan(node.value().clone()).id();
        for child in node.children() {
            let child = self.import(child);
            self.append(copy, child);
        }
        copy
    }

    /// Copies the top-level nodes of `fragment` and appends them to `parent`.
    pub fn append_fragment(&mut self, parent: NodeId, fragment: &Tree) {
        for child in fragment.tree.root().children() {
            let child = self.import(child);
            self.append(parent, child);
        }
    }

    /// Calls `f` for `id` and its descendants in preorder.
    ///
    /// The next sibling of each node is captured before `f` sees the node, so `f`
    /// may detach, replace or wrap the node it is given.
    pub fn for_each_preorder(
        &mut self,
        id: NodeId,
        f: &mut impl FnMut(&mut Tree, NodeId) -> Visit,
    ) {
        if f(self, id) == Visit::SkipChildren {
            return;
        }
        let mut child = self.first_child(id);
        while let Some(current) = child {
            child = self.next_sibling(current);
            self.for_each_preorder(current, f);
        }
    }

    /// Serializes `id` including its own tag.
    pub fn outer_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(self.node(id), false, &mut out);
        out
    }

    /// Serializes the children of `id`.
    pub fn inner_xml(&self, id: NodeId) -> String {
        let node = self.node(id);
        let foreign = node.value().element().is_some_and(Element::is_foreign);
        let mut out = String::new();
        for child in node.children() {
            self.write_node(child, foreign, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeRef<'_, Node>, foreign: bool, out: &mut String) {
        match node.value() {
            Node::Document => {
                for child in node.children() {
                    self.write_node(child, foreign, out);
                }
            }
            Node::Comment(comment) => {
                let _ = write!(out, "<!--{comment}-->");
            }
            Node::Text(text) => out.push_str(&partial_escape(text)),
            Node::Element(element) => {
                trace!("Serializing {element:?}");
                let foreign = foreign || element.is_foreign();
                out.push('<');
                out.push_str(&element.name);
                for (name, value) in element.attrs.iter() {
                    let _ = write!(out, r#" {name}="{}""#, escape(value));
                }
                if !node.has_children() {
                    // Stay both well-formed XML and parseable as HTML
                    if foreign {
                        out.push_str("/>");
                        return;
                    } else if element.is_void_element() {
                        out.push_str(" />");
                        return;
                    }
                }
                out.push('>');
                for child in node.children() {
                    self.write_node(child, foreign, out);
                }
                let _ = write!(out, "</{}>", element.name);
            }
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}
