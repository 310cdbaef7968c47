use std::collections::HashMap;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    tags::{mf, view, SIDENOTE_ID_PREFIX},
    tree::{Element, Tree},
};

use super::resolve::References;

/// Headings are cloned into the table of contents, so sidenotes go after them.
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new("h[1-9]").unwrap());

/// Where a sidenote gets inserted: into `parent`, before `before` (or at the end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InsertionPoint {
    parent: NodeId,
    before: Option<NodeId>,
}

/// Wraps the content of floating elements and creates sidenote surrogates for them.
pub fn lay_out(tree: &mut Tree, root: NodeId, refs: &mut References) {
    let floats = tree
        .elements_preorder(root)
        .into_iter()
        .filter(|&id| tree.is_element(id, mf::FIGURE) || tree.is_element(id, mf::NOTE))
        .collect::<Vec<_>>();

    // Sidenote styling needs two levels of wrappers below the floating element
    for &float in &floats {
        tree.wrap_children(float, Element::new("div"));
    }

    if tree.has_class(root, "no-sidenotes") {
        log::debug!("Sidenotes are disabled for this document");
        return;
    }

    let mut has_sidenotes = false;
    for float in floats {
        has_sidenotes |= float_surrogate(tree, float, refs);
    }
    has_sidenotes |= citation_surrogates(tree, root, refs);

    if has_sidenotes {
        tree.add_class(root, "has-sidenotes");
    }
}

/// Returns whether the element takes part in the margin layout.
fn float_surrogate(tree: &mut Tree, float: NodeId, refs: &mut References) -> bool {
    match tree.attr(float, "size") {
        Some("full") => return true,
        Some("large") => return false,
        _ => {}
    }

    let Some(id) = tree.attr(float, "id").filter(|id| !id.is_empty()) else {
        tree.add_class(float, "no-surrogate");
        return true;
    };
    let id = id.to_owned();

    let Some(&first_ref) = refs.usages(&id).first() else {
        // Unreferenced, so there is nowhere to put a surrogate
        return true;
    };

    let surrogate = tree.deep_clone(float);
    tree.set_attr(surrogate, "id", format!("{SIDENOTE_ID_PREFIX}{id}"));
    insert_sidenote(tree, surrogate, first_ref);

    tree.add_class(float, "hide-sidenote");
    if let Some(label) = refs.labels.get_mut(&id) {
        label.has_surrogate = true;
    }
    true
}

/// Citations get one surrogate per run of references under the same `h1`/`h2` section.
fn citation_surrogates(tree: &mut Tree, root: NodeId, refs: &mut References) -> bool {
    let mut sections = HashMap::new();
    let mut current_heading = None;
    for id in tree.elements_preorder(root) {
        if tree.is_element(id, "h1") || tree.is_element(id, "h2") {
            current_heading = Some(id);
        }
        sections.insert(id, current_heading);
    }

    let citations = tree
        .elements_preorder(root)
        .into_iter()
        .filter(|&id| tree.is_element(id, mf::CITE))
        .collect::<Vec<_>>();

    let mut has_sidenotes = false;
    for cite in citations {
        let Some(id) = tree.attr(cite, "id").filter(|id| !id.is_empty()) else {
            continue;
        };
        let id = id.to_owned();
        let usages = refs.usages(&id).to_vec();
        if usages.is_empty() {
            continue;
        }

        let mut last_section = None;
        for usage in usages {
            let section = sections.get(&usage).copied();
            if section == last_section {
                // This section already has a surrogate of the citation
                continue;
            }
            last_section = section;

            let surrogate = tree.deep_clone(cite);
            tree.remove_attr(surrogate, "id");
            tree.add_class(surrogate, "surrogate");
            insert_sidenote(tree, surrogate, usage);
        }

        has_sidenotes = true;
        if let Some(label) = refs.labels.get_mut(&id) {
            label.has_surrogate = true;
        }
    }
    has_sidenotes
}

fn insert_sidenote(tree: &mut Tree, surrogate: NodeId, reference: NodeId) {
    let sidenote = tree.create_element(Element::new(view::SIDENOTE));
    tree.append(sidenote, surrogate);
    let InsertionPoint { parent, before } = insertion_point(tree, reference);
    log::trace!("Inserting sidenote for {:?}", tree.attr(surrogate, "id"));
    tree.insert_into(parent, sidenote, before);
}

/// Walks up from `reference` and picks the outermost ancestor that cannot contain a sidenote.
fn insertion_point(tree: &Tree, reference: NodeId) -> InsertionPoint {
    let mut at = InsertionPoint {
        parent: tree.parent(reference).unwrap_or(reference),
        before: Some(reference),
    };
    let mut ancestor = tree.parent_element(reference);
    while let Some(current) = ancestor {
        ancestor = tree.parent_element(current);
        let (Some(element), Some(parent)) = (tree.element(current), tree.parent(current)) else {
            continue;
        };
        match element.name.as_str() {
            "table" | view::SIDENOTE | mf::CITE | mf::CODE | mf::CODE_BLOCK | "pre" | "code" => {
                at = InsertionPoint {
                    parent,
                    before: Some(current),
                };
            }
            name if HEADING.is_match(name) || name == mf::ADMONITION => {
                at = InsertionPoint {
                    parent,
                    before: tree.next_sibling(current),
                };
            }
            _ => {}
        }
    }
    at
}
