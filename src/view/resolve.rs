use std::collections::HashMap;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    tags::{mf, view},
    tree::{Element, Tree, Visit},
};

use super::{is_whitespace_text, Diagnostics};

/// Figure ids such as `Figure 3`, `Table:results` or `Eq.1`.
static FIGURE_STANDARD_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\p{L}+)(?:([ .:-]).*|[^\p{L}].*)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatKind {
    Note,
    Figure,
    Citation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefLabel {
    pub kind: FloatKind,
    /// Set once a sidenote surrogate has been created for the element.
    pub has_surrogate: bool,
    pub label: String,
}

/// Labels of floating elements and the references pointing at them.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct References {
    pub labels: HashMap<String, RefLabel>,
    /// Referencing `mf-ref` elements per target, in document order.
    pub usages: HashMap<String, Vec<NodeId>>,
}

impl References {
    pub fn usages(&self, target: &str) -> &[NodeId] {
        self.usages.get(target).map_or(&[], Vec::as_slice)
    }
}

#[derive(Default)]
struct Resolver {
    refs: References,
    next_figure_number: HashMap<String, u32>,
    next_note_number: u32,
}

/// Numbers and labels figures, notes and citations below `root` and records every `mf-ref`.
pub fn resolve(tree: &mut Tree, root: NodeId, diagnostics: &mut Diagnostics) -> References {
    let mut resolver = Resolver {
        next_note_number: 1,
        ..Resolver::default()
    };
    tree.for_each_preorder(root, &mut |tree, id| {
        let Some(element) = tree.element(id) else {
            return Visit::Children;
        };
        match element.name.as_str() {
            mf::FIGURE => resolver.figure(tree, id, diagnostics),
            mf::NOTE => resolver.note(tree, id),
            mf::CITE => resolver.citation(tree, id),
            mf::REF => {
                let target = tree.attr(id, "to").unwrap_or_default().to_owned();
                resolver.refs.usages.entry(target).or_default().push(id);
                return Visit::SkipChildren;
            }
            _ => {}
        }
        Visit::Children
    });
    resolver.refs
}

impl Resolver {
    fn figure(&mut self, tree: &mut Tree, figure: NodeId, diagnostics: &mut Diagnostics) {
        let id = tree.attr(figure, "id").filter(|id| !id.is_empty()).map(str::to_owned);
        let mut counter = tree.attr(figure, "counter").map(str::to_owned);
        let mut label = tree.attr(figure, "label").map(str::to_owned);

        if counter.is_none() && label.is_none() {
            let Some(id) = &id else {
                return;
            };
            let Some(captures) = FIGURE_STANDARD_ID.captures(id) else {
                diagnostics.insert_error(
                    tree,
                    figure,
                    &format!("Usage error: <code>{}</code>", mf::FIGURE),
                    format!("figure id {id:?} does not name a figure type"),
                );
                return;
            };
            let ty = &captures[1];
            let sep = captures.get(2).map_or("", |sep| sep.as_str());
            counter = Some(ty.to_lowercase());
            label = Some(format!(
                "{}{}{{}}",
                ty.replace("{}", "{\u{200b}}"),
                if sep == " " { " " } else { "" },
            ));
        }

        let counter = counter.unwrap_or_default();
        let label = label.unwrap_or_else(|| "??? {}".into());

        let number = self.next_figure_number.entry(counter).or_insert(1);
        let label = label.replace("{}", &number.to_string());
        *number += 1;

        if let Some(caption) = tree.first_descendant(figure, mf::FIGURE_CAPTION) {
            let marker = label_marker(tree, &label);
            prepend_phrasing_content(tree, marker, caption);
            // The caption always comes last
            tree.append(figure, caption);
        }

        if let Some(id) = id {
            self.record(id, FloatKind::Figure, label);
        }
    }

    fn note(&mut self, tree: &mut Tree, note: NodeId) {
        let Some(id) = tree.attr(note, "id").filter(|id| !id.is_empty()) else {
            return;
        };
        let id = id.to_owned();

        let label = self.next_note_number.to_string();
        self.next_note_number += 1;

        let marker = label_marker(tree, &label);
        prepend_phrasing_content(tree, marker, note);
        self.record(id, FloatKind::Note, label);
    }

    fn citation(&mut self, tree: &mut Tree, cite: NodeId) {
        let id = tree.attr(cite, "id").filter(|id| !id.is_empty()).map(str::to_owned);
        let label = (tree.attr(cite, "label").filter(|label| !label.is_empty()))
            .map(str::to_owned)
            .or_else(|| id.clone());
        let Some(label) = label else {
            return;
        };

        let marker = label_marker(tree, &format!("[{label}]"));
        prepend_phrasing_content(tree, marker, cite);

        if let Some(id) = id {
            self.record(id, FloatKind::Citation, label);
        }
    }

    fn record(&mut self, id: String, kind: FloatKind, label: String) {
        log::trace!("Resolved {kind:?} {id:?} as {label:?}");
        self.refs.labels.insert(
            id,
            RefLabel {
                kind,
                has_surrogate: false,
                label,
            },
        );
    }
}

fn label_marker(tree: &mut Tree, label: &str) -> NodeId {
    let marker = tree.create_element(Element::new(view::FLOATING_ELEMENT_LABEL));
    let text = tree.create_text(label);
    tree.append(marker, text);
    marker
}

/// Inserts `node` where it reads as the beginning of the first text of `container`, skipping
/// leading whitespace and descending into a leading paragraph.
fn prepend_phrasing_content(tree: &mut Tree, node: NodeId, container: NodeId) {
    let mut child = tree.first_child(container);
    while let Some(current) = child.filter(|&child| is_whitespace_text(tree, child)) {
        child = tree.next_sibling(current);
    }
    match child {
        Some(p) if tree.is_element(p, "p") => prepend_phrasing_content(tree, node, p),
        before => tree.insert_into(container, node, before),
    }
}
