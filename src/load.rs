use ego_tree::NodeId;
use quick_xml::escape::escape;

use crate::{
    render::ExpandText,
    tags::mf,
    tree::{Element, Tree},
    view::Diagnostics,
};

/// A document in canonical form: an `mf-document` element as the only child of the tree root.
#[derive(Debug)]
pub struct Loaded {
    pub tree: Tree,
    pub root: NodeId,
    /// Language declared on the input's `html` element.
    pub lang: Option<String>,
}

/// Parses `source` and extracts its Foremark document.
///
/// Never fails: input without a document yields a document containing an `mf-error`.
pub fn load(
    source: &str,
    expand_text: Option<&dyn ExpandText>,
    diagnostics: &mut Diagnostics,
) -> Loaded {
    let parsed = Tree::parse(source);
    let lang = (parsed.elements_preorder(parsed.root()).into_iter())
        .find(|&id| parsed.is_element(id, "html"))
        .and_then(|html| parsed.attr(html, "lang").or_else(|| parsed.attr(html, "xml:lang")))
        .filter(|lang| !lang.is_empty())
        .map(str::to_owned);

    let input = match parsed.errors().first() {
        Some(err) => Err(Some(err.as_str())),
        None => (parsed.elements_preorder(parsed.root()).into_iter())
            .find(|&id| {
                parsed.is_element(id, mf::DOCUMENT)
                    || parsed.is_element(id, mf::TEXT)
                    || parsed.is_element(id, "pre")
            })
            .ok_or(None),
    };

    let mut tree = Tree::new();
    let root = match input {
        Ok(input) if parsed.is_element(input, mf::DOCUMENT) => tree.import(parsed.node(input)),
        Ok(input) => {
            let document = tree.create_element(Element::new(mf::DOCUMENT));
            if parsed.is_element(input, "pre") {
                log::debug!("Expanding <pre> shorthand");
                let text = tree.create_element(Element::new(mf::TEXT));
                for child in parsed.node(input).children() {
                    let child = tree.import(child);
                    tree.append(text, child);
                }
                tree.append(document, text);
            } else {
                let text = tree.import(parsed.node(input));
                tree.append(document, text);
            }
            document
        }
        Err(parse_error) => {
            let document = tree.create_element(Element::new(mf::DOCUMENT));
            let mut markup = format!(
                "Could not find <code>&lt;{}&gt;</code> nor <code>&lt;{}&gt;</code>.",
                mf::DOCUMENT,
                mf::TEXT
            );
            let mut message = format!("Could not find <{}> nor <{}>", mf::DOCUMENT, mf::TEXT);
            if let Some(err) = parse_error {
                markup.push_str(&format!(" <code>{}</code>", escape(err)));
                message.push_str(&format!(": {err}"));
            }
            let error = diagnostics.error_element(&mut tree, &markup, message);
            tree.append(document, error);
            document
        }
    };
    let document_root = tree.root();
    tree.append(document_root, root);

    if let Some(expand_text) = expand_text {
        expand_texts(&mut tree, root, expand_text, diagnostics);
    }

    Loaded { tree, root, lang }
}

fn expand_texts(
    tree: &mut Tree,
    root: NodeId,
    expand_text: &dyn ExpandText,
    diagnostics: &mut Diagnostics,
) {
    let texts = (tree.elements_preorder(root).into_iter())
        .filter(|&id| tree.is_element(id, mf::TEXT))
        .collect::<Vec<_>>();
    for text in texts {
        let expanded = expand_text
            .expand(&tree.inner_xml(text))
            .and_then(|markup| {
                let fragment = Tree::parse(&markup);
                match fragment.errors().first() {
                    Some(err) => anyhow::bail!("Malformed markup: {err}"),
                    None => Ok(fragment),
                }
            });
        match expanded {
            Ok(fragment) => {
                tree.remove_children(text);
                tree.append_fragment(text, &fragment);
            }
            Err(err) => {
                let markup = format!(
                    "<code>&lt;{}&gt;</code>: expansion failed: <code>{}</code>",
                    mf::TEXT,
                    escape(&format!("{err:#}"))
                );
                diagnostics.insert_error(tree, text, &markup, format!("<{}>: expansion failed: {err:#}", mf::TEXT));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(source: &str) -> (String, Option<String>, Vec<String>) {
        let mut diagnostics = Diagnostics::default();
        let Loaded { tree, root, lang } = load(source, None, &mut diagnostics);
        assert_eq!(tree.parent(root), Some(tree.root()));
        (tree.outer_xml(root), lang, diagnostics.messages)
    }

    #[test]
    fn document_is_detached_from_page() {
        let (xml, lang, _) = loaded(
            r#"<html xmlns="http://www.w3.org/1999/xhtml" lang="ja"><body><mf-document class="a"><p>x</p></mf-document></body></html>"#,
        );
        assert_eq!(xml, r#"<mf-document class="a"><p>x</p></mf-document>"#);
        assert_eq!(lang.as_deref(), Some("ja"));
    }

    #[test]
    fn shorthands() {
        let (xml, lang, _) = loaded("<mf-text>Hello *world*</mf-text>");
        assert_eq!(xml, "<mf-document><mf-text>Hello *world*</mf-text></mf-document>");
        assert_eq!(lang, None);

        let (xml, _, _) = loaded("<html><body><pre>Hello <b>world</b></pre></body></html>");
        assert_eq!(xml, "<mf-document><mf-text>Hello <b>world</b></mf-text></mf-document>");
    }

    #[test]
    fn missing_document() {
        let (xml, _, messages) = loaded("<html><body><p>Nothing</p></body></html>");
        assert_eq!(
            xml,
            "<mf-document><mf-error>Could not find <code>&lt;mf-document&gt;</code> nor <code>&lt;mf-text&gt;</code>.</mf-error></mf-document>"
        );
        assert_eq!(messages, ["Could not find <mf-document> nor <mf-text>"]);
    }

    #[test]
    fn malformed_input() {
        let (xml, _, messages) = loaded("<mf-document><p></mf-document>");
        assert!(xml.starts_with(
            "<mf-document><mf-error>Could not find <code>&lt;mf-document&gt;</code> nor <code>&lt;mf-text&gt;</code>. <code>XML parse error"
        ));
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn text_is_expanded() {
        struct Paragraphs;
        impl ExpandText for Paragraphs {
            fn expand(&self, text: &str) -> anyhow::Result<String> {
                if text.contains('<') {
                    anyhow::bail!("unexpected markup");
                }
                Ok(text.split("\n\n").map(|p| format!("<p>{p}</p>")).collect())
            }
        }
        let mut diagnostics = Diagnostics::default();
        let Loaded { tree, root, .. } = load(
            "<mf-document><mf-text>a\n\nb</mf-text><mf-text><b>c</b></mf-text></mf-document>",
            Some(&Paragraphs),
            &mut diagnostics,
        );
        assert_eq!(
            tree.outer_xml(root),
            "<mf-document><mf-text><p>a</p><p>b</p></mf-text><mf-error><code>&lt;mf-text&gt;</code>: expansion failed: <code>unexpected markup</code></mf-error><mf-text><b>c</b></mf-text></mf-document>"
        );
        assert_eq!(diagnostics.messages.len(), 1);
    }
}
