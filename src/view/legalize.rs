use ego_tree::NodeId;

use crate::{
    tags::view,
    tree::{Element, Tree},
};

/// Wraps every `table` in a `div.tableWrapper` that scrolls horizontally.
pub fn wrap_tables(tree: &mut Tree, root: NodeId) {
    for id in tree.elements_preorder(root) {
        if tree.is_element(id, "table") {
            tree.wrap(id, Element::with_attrs("div", [("class", "tableWrapper")]));
        }
    }
}

/// Moves sidenotes out of paragraphs, which may not contain the block content of a surrogate.
///
/// Sidenotes found inside a `p` are placed right after it, in their original order.
pub fn move_sidenotes_out_of_paragraphs(tree: &mut Tree, root: NodeId) {
    for paragraph in tree.elements_preorder(root) {
        if !tree.is_element(paragraph, "p") || tree.parent(paragraph).is_none() {
            continue;
        }
        let mut after = paragraph;
        for sidenote in outermost_sidenotes(tree, paragraph) {
            log::trace!("Moving a sidenote out of a paragraph");
            tree.insert_after(after, sidenote);
            after = sidenote;
        }
    }
}

fn outermost_sidenotes(tree: &Tree, id: NodeId) -> Vec<NodeId> {
    let mut found = Vec::new();
    let mut stack = tree.children(id);
    stack.reverse();
    while let Some(node) = stack.pop() {
        if tree.is_element(node, view::SIDENOTE) {
            found.push(node);
        } else {
            stack.extend(tree.children(node).into_iter().rev());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidenotes_leave_paragraphs_in_order() {
        let mut tree = Tree::parse(
            "<r><p>a<mf-sidenote>1</mf-sidenote>b<em><mf-sidenote>2</mf-sidenote></em></p><p>c</p></r>",
        );
        let root = tree.root();
        move_sidenotes_out_of_paragraphs(&mut tree, root);
        assert_eq!(
            tree.inner_xml(root),
            "<r><p>ab<em></em></p><mf-sidenote>1</mf-sidenote><mf-sidenote>2</mf-sidenote><p>c</p></r>"
        );
    }

    #[test]
    fn tables_are_wrapped() {
        let mut tree = Tree::parse("<r><table><tr><td>x</td></tr></table></r>");
        let root = tree.root();
        wrap_tables(&mut tree, root);
        assert_eq!(
            tree.inner_xml(root),
            r#"<r><div class="tableWrapper"><table><tr><td>x</td></tr></table></div></r>"#
        );
    }
}
