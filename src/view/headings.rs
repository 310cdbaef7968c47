use ego_tree::NodeId;

use crate::{
    tree::{Element, Tree},
    url,
};

const LEVELS: usize = 10;

/// Section counters and slug paths, indexed by heading level.
#[derive(Debug, Default)]
struct Numbering {
    counter: [u32; LEVELS],
    names: [String; LEVELS],
}

/// Anchors every `h1`–`h9` below `root` and, if `assign_numbers` is set, prefixes it with its
/// section number.
pub fn number_headings(tree: &mut Tree, root: NodeId, assign_numbers: bool) {
    let mut numbering = Numbering::default();
    for heading in tree.elements_preorder(root) {
        if let Some(level) = tree.element(heading).and_then(Element::heading_level) {
            numbering.heading(tree, heading, level, assign_numbers);
        }
    }
}

impl Numbering {
    fn heading(&mut self, tree: &mut Tree, heading: NodeId, level: usize, assign_numbers: bool) {
        if assign_numbers {
            self.counter[level] += 1;
            self.counter[level + 1..].fill(0);
        }

        let number = self.section_number(level);

        // Markdeep-compatible slug
        let text: String = (tree.text_content(heading).chars())
            .filter(|c| !c.is_whitespace())
            .collect();
        let mut name = url::encode(&text.to_lowercase()).into_owned();
        if name.is_empty() {
            name.clone_from(&number);
        }
        if level > 1 {
            name = format!("{}/{name}", self.names[level - 1]);
        }
        for deeper in &mut self.names[level + 1..] {
            deeper.clone_from(&name);
        }
        self.names[level] = name;

        let id = tree
            .remove_attr(heading, "id")
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.names[level].clone());
        log::trace!("Heading {number} anchored at {id:?}");

        let anchor = tree.create_element(Element::with_attrs(
            "a",
            [("id", id.as_str()), ("class", "anchor")],
        ));
        tree.set_attr(heading, "data-anchor", id);
        tree.insert_before(heading, anchor);

        if assign_numbers {
            let space = tree.create_text(" ");
            tree.prepend(heading, space);
            let span = tree.create_element(Element::with_attrs(
                "span",
                [("class", "section-number")],
            ));
            let text = tree.create_text(number);
            tree.append(span, text);
            tree.prepend(heading, span);
        }
    }

    /// The section number in `1.2.3` style.
    fn section_number(&self, level: usize) -> String {
        (self.counter[1..=level].iter())
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}
