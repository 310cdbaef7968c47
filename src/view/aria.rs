use ego_tree::NodeId;

use crate::{
    tags::{mf, view},
    tree::Tree,
};

/// Generates ids for elements that need to be referenced by ARIA attributes.
#[derive(Debug)]
pub struct Nonces {
    next: u32,
}

impl Nonces {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> String {
        let nonce = format!("e-{}", self.next);
        self.next += 1;
        nonce
    }
}

/// Adds roles and labelling attributes to the document below `root`.
pub fn annotate(tree: &mut Tree, root: NodeId, nonces: &mut Nonces) {
    for id in tree.elements_preorder(root) {
        let Some(element) = tree.element(id) else {
            continue;
        };
        let name = element.name.clone();
        let heading_level = element.heading_level().filter(|_| name.starts_with('h'));
        match name.as_str() {
            mf::FIGURE => {
                tree.set_attr(id, "role", "figure");
                labelled_by(tree, id, "aria-labelledby", view::FLOATING_ELEMENT_LABEL, nonces);
                labelled_by(tree, id, "aria-describedby", mf::FIGURE_CAPTION, nonces);
            }
            mf::NOTE => {
                tree.set_attr(id, "role", "note");
                labelled_by(tree, id, "aria-labelledby", view::FLOATING_ELEMENT_LABEL, nonces);
            }
            mf::ERROR | mf::CODE | mf::CODE_BLOCK => tree.set_attr(id, "role", "group"),
            mf::DIAGRAM => tree.set_attr(id, "role", "img"),
            mf::ADMONITION => {
                tree.set_attr(id, "role", "group");
                labelled_by(tree, id, "aria-labelledby", mf::ADMONITION_TITLE, nonces);
            }
            mf::TITLE => {
                tree.set_attr(id, "role", "heading");
                tree.set_attr(id, "aria-level", "1");
                let title = ensure_id(tree, id, nonces);
                tree.set_attr(root, "aria-labelledby", title);
            }
            _ => {
                if let Some(level) = heading_level {
                    tree.set_attr(id, "aria-level", (level + 1).to_string());
                }
            }
        }
    }
    tree.set_attr(root, "role", "document");
}

/// Points `attr` of `id` at its first descendant named `name`, if any.
fn labelled_by(tree: &mut Tree, id: NodeId, attr: &str, name: &str, nonces: &mut Nonces) {
    if let Some(label) = tree.first_descendant(id, name) {
        let label = ensure_id(tree, label, nonces);
        tree.set_attr(id, attr, label);
    }
}

fn ensure_id(tree: &mut Tree, id: NodeId, nonces: &mut Nonces) -> String {
    match tree.attr(id, "id").filter(|id| !id.is_empty()) {
        Some(existing) => existing.to_owned(),
        None => {
            let nonce = nonces.next();
            tree.set_attr(id, "id", nonce.clone());
            nonce
        }
    }
}

impl Default for Nonces {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotated(xml: &str) -> String {
        let mut tree = Tree::parse(xml);
        let root = tree.first_element_child(tree.root()).unwrap();
        annotate(&mut tree, root, &mut Nonces::new());
        tree.outer_xml(root)
    }

    #[test]
    fn roles_and_labels() {
        assert_eq!(
            annotated(
                r#"<mf-document><mf-title>T</mf-title><h1>A</h1><mf-figure><mf-label>Figure 1</mf-label><mf-figure-caption id="cap">c</mf-figure-caption></mf-figure><mf-error>e</mf-error><mf-diagram>d</mf-diagram></mf-document>"#
            ),
            r#"<mf-document aria-labelledby="e-1" role="document"><mf-title id="e-1" role="heading" aria-level="1">T</mf-title><h1 aria-level="2">A</h1><mf-figure role="figure" aria-labelledby="e-2" aria-describedby="cap"><mf-label id="e-2">Figure 1</mf-label><mf-figure-caption id="cap">c</mf-figure-caption></mf-figure><mf-error role="group">e</mf-error><mf-diagram role="img">d</mf-diagram></mf-document>"#
        );
    }

    #[test]
    fn admonitions_and_notes() {
        assert_eq!(
            annotated(
                r#"<mf-document><mf-admonition><mf-admonition-title>Note</mf-admonition-title>x</mf-admonition><mf-note><div><mf-label>1</mf-label></div></mf-note><mf-codeblock>c</mf-codeblock></mf-document>"#
            ),
            r#"<mf-document role="document"><mf-admonition role="group" aria-labelledby="e-1"><mf-admonition-title id="e-1">Note</mf-admonition-title>x</mf-admonition><mf-note role="note" aria-labelledby="e-2"><div><mf-label id="e-2">1</mf-label></div></mf-note><mf-codeblock role="group">c</mf-codeblock></mf-document>"#
        );
    }
}
