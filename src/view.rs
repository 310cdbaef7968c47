//! Transforms a Foremark document for viewing.

use std::{fmt, sync::Arc};

use ego_tree::NodeId;
use indexmap::IndexMap;

use crate::{
    highlight::SyntectHighlighter,
    math,
    media::{self, MediaContext, MediaHandlers},
    render::{DiagramRenderer, ExpandText, Highlighter, MathRenderer, TexSource},
    tags::mf,
    tree::{Element, Node, Tree},
};

mod aria;
mod embed;
mod headings;
mod layout;
mod legalize;
mod link;
mod resolve;

/// Options of the view transformation and the renderers it delegates to.
#[derive(Clone)]
pub struct ViewerConfig {
    /// Prefix headings with section numbers.
    pub heading_numbers: bool,
    pub media_handlers: MediaHandlers,
    pub math: Arc<dyn MathRenderer>,
    pub math_macros: IndexMap<String, String>,
    pub highlighter: Arc<dyn Highlighter>,
    /// Diagrams are left as they are if unset.
    pub diagram: Option<Arc<dyn DiagramRenderer>>,
    /// Expands the shorthand syntax of `mf-text`, which is kept verbatim if unset.
    pub expand_text: Option<Arc<dyn ExpandText>>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            heading_numbers: false,
            media_handlers: media::builtin_media_handlers(),
            math: Arc::new(TexSource),
            math_macros: math::markdeep_macros(),
            highlighter: Arc::new(SyntectHighlighter),
            diagram: None,
            expand_text: None,
        }
    }
}

impl fmt::Debug for ViewerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerConfig")
            .field("heading_numbers", &self.heading_numbers)
            .field("media_handlers", &self.media_handlers)
            .field("math_macros", &self.math_macros)
            .field("diagram", &self.diagram.is_some())
            .field("expand_text", &self.expand_text.is_some())
            .finish_non_exhaustive()
    }
}

/// Problems reported in the document as `mf-error` elements.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub messages: Vec<String>,
}

impl Diagnostics {
    pub fn warn(&mut self, message: String) {
        log::warn!("{message}");
        self.messages.push(message);
    }

    /// Creates a detached `mf-error` element with the given content.
    pub fn error_element(&mut self, tree: &mut Tree, markup: &str, message: String) -> NodeId {
        self.warn(message);
        let fragment = Tree::parse(&format!("<{0}>{markup}</{0}>", mf::ERROR));
        match fragment.first_element_child(fragment.root()) {
            Some(error) if fragment.errors().is_empty() => tree.import(fragment.node(error)),
            _ => {
                let error = tree.create_element(Element::new(mf::ERROR));
                let text = tree.create_text(markup);
                tree.append(error, text);
                error
            }
        }
    }

    pub fn insert_error(
        &mut self,
        tree: &mut Tree,
        before: NodeId,
        markup: &str,
        message: String,
    ) -> NodeId {
        let error = self.error_element(tree, markup, message);
        tree.insert_before(before, error);
        error
    }

    pub fn replace_with_error(
        &mut self,
        tree: &mut Tree,
        node: NodeId,
        markup: &str,
        message: String,
    ) -> NodeId {
        let error = self.error_element(tree, markup, message);
        tree.replace(node, error);
        error
    }
}

/// Rewrites the `mf-document` element `root` into its presentation form.
pub async fn prepare_for_viewing(
    tree: &mut Tree,
    root: NodeId,
    config: &ViewerConfig,
    ctx: &MediaContext,
    diagnostics: &mut Diagnostics,
) {
    log::debug!("Numbering headings");
    headings::number_headings(tree, root, config.heading_numbers);

    log::debug!("Resolving floating elements and references");
    let mut refs = resolve::resolve(tree, root, diagnostics);
    layout::lay_out(tree, root, &mut refs);
    link::link_references(tree, root, &refs);

    aria::annotate(tree, root, &mut aria::Nonces::new());
    legalize::wrap_tables(tree, root);

    embed::render_embedded(tree, root, config, ctx, diagnostics).await;

    legalize::move_sidenotes_out_of_paragraphs(tree, root);
}

/// Replaces the children of `parent` with a parsed markup fragment.
fn replace_children_with_markup(tree: &mut Tree, parent: NodeId, markup: &str) -> anyhow::Result<()> {
    let fragment = parse_fragment(markup)?;
    tree.remove_children(parent);
    tree.append_fragment(parent, &fragment);
    Ok(())
}

fn parse_fragment(markup: &str) -> anyhow::Result<Tree> {
    let fragment = Tree::parse(markup);
    if let Some(err) = fragment.errors().first() {
        anyhow::bail!("Malformed markup: {err}");
    }
    Ok(fragment)
}

fn is_whitespace_text(tree: &Tree, id: NodeId) -> bool {
    matches!(tree.node(id).value(), Node::Text(text) if text.trim().is_empty())
}
