use ego_tree::NodeId;

use crate::{
    tags::{mf, SIDENOTE_ID_PREFIX},
    tree::{Element, Tree, Visit},
    url,
};

use super::resolve::{FloatKind, References};

/// Replaces every `mf-ref` with a link to its target.
pub fn link_references(tree: &mut Tree, root: NodeId, refs: &References) {
    tree.for_each_preorder(root, &mut |tree, id| {
        if !tree.is_element(id, mf::REF) {
            return Visit::Children;
        }
        link(tree, id, refs);
        Visit::SkipChildren
    });
}

fn link(tree: &mut Tree, reference: NodeId, refs: &References) {
    let target = tree.attr(reference, "to").unwrap_or_default().to_owned();
    let resolved = refs.labels.get(&target);
    let (kind, label) = match resolved {
        Some(resolved) => (Some(resolved.kind), resolved.label.as_str()),
        None => {
            log::debug!("Reference to unknown target {target:?}");
            (None, "?")
        }
    };

    let link = anchor(tree, &target);
    let text = tree.create_text(label);
    if kind == Some(FloatKind::Note) {
        let sup = tree.create_element(Element::new("sup"));
        tree.append(sup, text);
        tree.append(link, sup);
    } else {
        tree.append(link, text);
    }
    tree.replace(reference, link);

    if kind == Some(FloatKind::Citation) {
        let open = tree.create_text("[");
        tree.insert_before(link, open);
        let close = tree.create_text("]");
        tree.insert_after(link, close);
    }

    // Citations may have several surrogates, so there is no single one to link to
    if resolved.is_some_and(|resolved| resolved.has_surrogate) && kind != Some(FloatKind::Citation)
    {
        let sidenote_link = tree.deep_clone(link);
        tree.set_attr(
            sidenote_link,
            "href",
            format!("#{}", url::encode_component(&format!("{SIDENOTE_ID_PREFIX}{target}"))),
        );
        tree.insert_before(link, sidenote_link);
        tree.add_class(link, "hide-sidenote");
        tree.add_class(sidenote_link, "only-sidenote");
    }
}

fn anchor(tree: &mut Tree, target: &str) -> NodeId {
    let href = format!("#{}", url::encode_component(target));
    tree.create_element(Element::with_attrs("a", [("href", href.as_str())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{layout::lay_out, resolve::resolve, Diagnostics};

    fn linked(xml: &str) -> String {
        let mut tree = Tree::parse(xml);
        let root = tree.first_element_child(tree.root()).unwrap();
        let mut refs = resolve(&mut tree, root, &mut Diagnostics::default());
        lay_out(&mut tree, root, &mut refs);
        link_references(&mut tree, root, &refs);
        tree.inner_xml(root)
    }

    #[test]
    fn missing_target_links_with_placeholder() {
        assert_eq!(
            linked(r#"<mf-document><p>See <mf-ref to="nowhere at all"/></p></mf-document>"#),
            r##"<p>See <a href="#nowhere%20at%20all">?</a></p>"##
        );
    }

    #[test]
    fn figure_and_citation_links() {
        assert_eq!(
            linked(
                r#"<mf-document class="no-sidenotes"><mf-figure id="Figure a"></mf-figure><mf-cite id="k">K</mf-cite><p><mf-ref to="Figure a"/> <mf-ref to="k"/></p></mf-document>"#
            ),
            r##"<mf-figure id="Figure a"><div></div></mf-figure><mf-cite id="k"><mf-label>[k]</mf-label>K</mf-cite><p><a href="#Figure%20a">Figure 1</a> [<a href="#k">k</a>]</p>"##
        );
    }

    #[test]
    fn surrogate_targets_get_link_pairs() {
        assert_eq!(
            linked(r#"<mf-document><p>A<mf-ref to="n"/></p><mf-note id="n">B</mf-note></mf-document>"#),
            r##"<p>A<mf-sidenote><mf-note id="sidenote.n"><div><mf-label>1</mf-label>B</div></mf-note></mf-sidenote><a class="only-sidenote" href="#sidenote.n"><sup>1</sup></a><a class="hide-sidenote" href="#n"><sup>1</sup></a></p><mf-note id="n" class="hide-sidenote"><div><mf-label>1</mf-label>B</div></mf-note>"##
        );
    }
}
