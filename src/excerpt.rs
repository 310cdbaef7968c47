use ego_tree::NodeId;

use crate::{
    tags::mf,
    tree::{Node, Tree},
};

/// Elements kept whole and not counted.
const INDIVISIBLE: [&str; 3] = ["svg", mf::EQUATION, mf::DISPLAY_EQUATION];

/// Prefixes of the names of elements left out of excerpts.
const EXCLUDED_PREFIXES: [&str; 6] = [
    "mf-title",
    "mf-note",
    "mf-figure",
    "mf-lead",
    "mf-cite",
    "mf-sidenote",
];

/// Truncates rendered markup to about `limit` characters of text.
///
/// Titles, floating elements, sidenotes, and tables are left out, and links are replaced with
/// their content.
pub fn create_excerpt_html(html: &str, limit: usize) -> String {
    let mut tree = Tree::parse(&format!("<main>{html}</main>"));
    for err in tree.errors() {
        log::debug!("Creating an excerpt of malformed markup: {err}");
    }
    let Some(main) = tree.first_element_child(tree.root()) else {
        return String::new();
    };

    let mut excerpt = Excerpt { limit, length: 0 };
    excerpt.truncate(&mut tree, main);

    match tree.first_child(main) {
        Some(document) if tree.is_element(document, mf::DOCUMENT) => tree.inner_xml(document),
        _ => tree.inner_xml(main),
    }
}

struct Excerpt {
    limit: usize,
    length: usize,
}

impl Excerpt {
    /// Returns `true` once the budget is used up, after which nothing else may follow.
    fn truncate(&mut self, tree: &mut Tree, id: NodeId) -> bool {
        let name = match tree.node(id).value() {
            Node::Text(text) => {
                let length = text.chars().count();
                if self.length + length > self.limit {
                    let mut cut: String = text.chars().take(self.limit - self.length).collect();
                    cut.push('…');
                    *tree.node_mut(id).value() = Node::Text(cut);
                    return true;
                }
                self.length += length;
                return false;
            }
            Node::Element(element) => element.name.clone(),
            Node::Document | Node::Comment(_) => return false,
        };
        if INDIVISIBLE.contains(&name.as_str()) {
            return false;
        }

        let mut child = tree.first_child(id);
        while let Some(current) = child {
            if is_excluded(tree, current) {
                child = tree.next_sibling(current);
                tree.detach(current);
                continue;
            }

            if tree.is_element(current, "a") {
                // Promote the link's children and visit them next
                let children = tree.children(current);
                for &promoted in &children {
                    tree.insert_before(current, promoted);
                }
                child = children.first().copied().or_else(|| tree.next_sibling(current));
                tree.detach(current);
                continue;
            }

            if self.truncate(tree, current) {
                while let Some(next) = tree.next_sibling(current) {
                    tree.detach(next);
                }
                return true;
            }

            child = tree.next_sibling(current);
        }
        false
    }
}

fn is_excluded(tree: &Tree, id: NodeId) -> bool {
    tree.element(id).is_some_and(|element| {
        matches!(element.name.as_str(), "table" | "figure")
            || (EXCLUDED_PREFIXES.iter()).any(|prefix| element.name.starts_with(prefix))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_at_budget() {
        assert_eq!(
            create_excerpt_html("<main><p>Hello world</p></main>", 5),
            "<main><p>Hello…</p></main>"
        );
        assert_eq!(
            create_excerpt_html("<p>Hello</p><p>world</p><p>!</p>", 7),
            "<p>Hello</p><p>wo…</p>"
        );
    }

    #[test]
    fn text_within_budget_is_kept() {
        assert_eq!(create_excerpt_html("<p>Hello</p>", 5), "<p>Hello</p>");
    }

    #[test]
    fn links_are_dissolved_and_figures_dropped() {
        assert_eq!(
            create_excerpt_html(
                r#"<p>Please <a href="x">click <b>here</b></a> now</p><figure><img src="a.png"/></figure>"#,
                100
            ),
            "<p>Please click <b>here</b> now</p>"
        );
        assert_eq!(
            create_excerpt_html(r#"<p>Please <a href="x">click</a> now</p>"#, 9),
            "<p>Please cl…</p>"
        );
    }

    #[test]
    fn floating_elements_and_tables_are_dropped() {
        assert_eq!(
            create_excerpt_html(
                r#"<mf-document><mf-title>T</mf-title><p>a<mf-sidenote>s</mf-sidenote><mf-note id="n">n</mf-note></p><div class="tableWrapper"><table><tr><td>x</td></tr></table></div><mf-figure-caption>c</mf-figure-caption></mf-document>"#,
                100
            ),
            r#"<p>a</p><div class="tableWrapper"></div>"#
        );
    }

    #[test]
    fn indivisible_elements_are_not_counted() {
        assert_eq!(
            create_excerpt_html("<p>ab<mf-eq>x + y</mf-eq>cd</p><p>e</p>", 4),
            "<p>ab<mf-eq>x + y</mf-eq>cd</p><p>…</p>"
        );
    }

    #[test]
    fn unicode_is_counted_by_characters() {
        assert_eq!(create_excerpt_html("<p>日本語のテキスト</p>", 3), "<p>日本語…</p>");
    }
}
