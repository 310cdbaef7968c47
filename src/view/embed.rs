use ego_tree::NodeId;
use futures::future::join_all;
use quick_xml::escape::escape;

use crate::{
    math,
    media::{self, MediaContext, MediaElement, MediaError},
    render::MathOptions,
    tags::{mf, view, CODE_TYPE},
    tree::{Element, Node, Tree, Visit},
};

use super::{parse_fragment, replace_children_with_markup, Diagnostics, ViewerConfig};

/// Work for an external renderer, detached from the tree.
#[derive(Debug)]
enum Job {
    Math { tex: String, display: bool },
    Code { code: String, language: Option<String> },
    Diagram { source: String },
    Media(MediaElement),
}

#[derive(Debug)]
struct Pending {
    node: NodeId,
    job: Job,
}

#[derive(Debug, thiserror::Error)]
enum RenderError {
    #[error("<{tag}>: rendering failed: {error:#}")]
    Renderer {
        tag: &'static str,
        error: anyhow::Error,
    },
    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Renders equations, code, diagrams and media below `root`.
///
/// All renderers run concurrently. Their results are merged into the tree once every one of
/// them has finished, and a failure only replaces the element that failed.
pub async fn render_embedded(
    tree: &mut Tree,
    root: NodeId,
    config: &ViewerConfig,
    ctx: &MediaContext,
    diagnostics: &mut Diagnostics,
) {
    let mut pending = Vec::new();
    tree.for_each_preorder(root, &mut |tree, id| {
        let Some(name) = tree.element(id).map(|element| element.name.clone()) else {
            return Visit::Children;
        };
        let job = match name.as_str() {
            mf::EQUATION | mf::DISPLAY_EQUATION => Job::Math {
                tex: tree.text_content(id),
                display: name == mf::DISPLAY_EQUATION,
            },
            mf::CODE => {
                // `pre` keeps the code formatted in reader modes
                tree.wrap(id, Element::new("pre"));
                let language = (tree.attr(id, CODE_TYPE).unwrap_or_default().split(' '))
                    .next()
                    .filter(|language| !language.is_empty())
                    .map(str::to_owned);
                Job::Code {
                    code: tree.text_content(id),
                    language,
                }
            }
            mf::DIAGRAM => {
                if config.diagram.is_none() {
                    log::warn!("No diagram renderer is configured, leaving <{name}> as is");
                    return Visit::SkipChildren;
                }
                Job::Diagram {
                    source: tree.text_content(id),
                }
            }
            mf::MEDIA => Job::Media(MediaElement {
                attrs: tree.element(id).map_or_else(Default::default, |element| {
                    (element.attrs.iter())
                        .map(|(name, value)| (name.to_owned(), value.to_owned()))
                        .collect()
                }),
            }),
            _ => return Visit::Children,
        };
        pending.push(Pending { node: id, job });
        Visit::SkipChildren
    });

    log::debug!("Rendering {} embedded elements", pending.len());
    let results = join_all(pending.iter().map(|pending| pending.job.run(config, ctx))).await;

    for (pending, result) in pending.into_iter().zip(results) {
        let result = result.and_then(|rendered| pending.apply(tree, rendered));
        if let Err(err) = result {
            let node = pending.error_target(tree);
            diagnostics.replace_with_error(tree, node, &err.to_markup(), err.to_string());
        }
    }
}

impl Job {
    fn tag(&self) -> &'static str {
        match self {
            Self::Math { display: false, .. } => mf::EQUATION,
            Self::Math { display: true, .. } => mf::DISPLAY_EQUATION,
            Self::Code { .. } => mf::CODE,
            Self::Diagram { .. } => mf::DIAGRAM,
            Self::Media(_) => mf::MEDIA,
        }
    }

    /// Returns the rendered markup, or `None` if the element keeps its content.
    async fn run(
        &self,
        config: &ViewerConfig,
        ctx: &MediaContext,
    ) -> Result<Option<String>, RenderError> {
        let rendered = match self {
            Self::Math { tex, display } => {
                let options = MathOptions {
                    display: *display,
                    macros: &config.math_macros,
                };
                (config.math.render(tex, options).await).map(|markup| math::xhtmlify(&markup))
            }
            Self::Code {
                code,
                language: Some(language),
            } => config.highlighter.highlight(code, language).await,
            Self::Code { language: None, .. } => return Ok(None),
            Self::Diagram { source } => match &config.diagram {
                Some(diagram) => diagram.to_svg(source).await,
                None => return Ok(None),
            },
            Self::Media(media) => {
                return media::render_media(media, &config.media_handlers, ctx)
                    .await
                    .map(Some)
                    .map_err(RenderError::from)
            }
        };
        rendered.map(Some).map_err(|error| self.error(error))
    }

    fn error(&self, error: anyhow::Error) -> RenderError {
        RenderError::Renderer {
            tag: self.tag(),
            error,
        }
    }
}

impl Pending {
    /// The node an error replaces. Code takes its `pre` wrapper along.
    fn error_target(&self, tree: &Tree) -> NodeId {
        match (&self.job, tree.parent(self.node)) {
            (Job::Code { .. }, Some(pre)) if tree.is_element(pre, "pre") => pre,
            _ => self.node,
        }
    }

    fn apply(&self, tree: &mut Tree, rendered: Option<String>) -> Result<(), RenderError> {
        let node = self.node;
        match (&self.job, rendered) {
            (Job::Math { .. }, Some(markup)) => {
                replace_children_with_markup(tree, node, &markup).map_err(|err| self.job.error(err))
            }
            (Job::Code { .. }, rendered) => {
                if let Some(markup) = rendered {
                    replace_children_with_markup(tree, node, &markup)
                        .map_err(|err| self.job.error(err))?;
                }
                insert_code_line_heads(tree, node);
                tree.wrap_children(node, Element::new("span"));
                Ok(())
            }
            (Job::Diagram { .. }, Some(markup)) => {
                replace_children_with_markup(tree, node, &markup)
                    .and_then(|()| make_diagram_responsive(tree, node))
                    .map_err(|err| self.job.error(err))
            }
            (Job::Media(_), Some(markup)) => {
                let fragment = parse_fragment(&markup).map_err(|err| self.job.error(err))?;
                let placeholder = tree.create_element(Element::new(mf::MEDIA));
                tree.replace(node, placeholder);
                tree.append_fragment(placeholder, &fragment);
                for child in tree.children(placeholder) {
                    tree.insert_before(placeholder, child);
                }
                tree.detach(placeholder);
                Ok(())
            }
            (_, None) => Ok(()),
        }
    }
}

impl RenderError {
    fn to_markup(&self) -> String {
        match self {
            Self::Renderer { tag, error } => format!(
                "<code>&lt;{tag}&gt;</code>: rendering failed: <code>{}</code>",
                escape(&format!("{error:#}"))
            ),
            Self::Media(err) => err.to_markup(),
        }
    }
}

/// Inserts a line head marker at the start of `code` and after every newline in its text.
fn insert_code_line_heads(tree: &mut Tree, code: NodeId) {
    let texts = (tree.node(code).descendants())
        .filter(|node| node.value().as_text().is_some_and(|text| text.contains('\n')))
        .map(|node| node.id())
        .collect::<Vec<_>>();
    for text_node in texts {
        let text = match tree.node(text_node).value() {
            Node::Text(text) => text.clone(),
            _ => continue,
        };
        for line in text.split_inclusive('\n') {
            let line_node = tree.create_text(line);
            tree.insert_before(text_node, line_node);
            if line.ends_with('\n') {
                let head = tree.create_element(Element::new(view::CODE_LINE_HEAD));
                tree.insert_before(text_node, head);
            }
        }
        tree.detach(text_node);
    }

    let head = tree.create_element(Element::new(view::CODE_LINE_HEAD));
    tree.prepend(code, head);
}

/// Replaces the fixed size of a diagram's `svg` with a view box that scales.
fn make_diagram_responsive(tree: &mut Tree, diagram: NodeId) -> anyhow::Result<()> {
    let svg = tree
        .first_element_child(diagram)
        .filter(|&svg| tree.is_element(svg, "svg"))
        .ok_or_else(|| anyhow::anyhow!("The diagram renderer did not produce an <svg> image"))?;

    let dimension = |name| -> anyhow::Result<f64> {
        let value = tree.attr(svg, name).unwrap_or_default();
        value
            .trim()
            .trim_end_matches("px")
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid diagram {name}: {value:?}"))
    };
    let (width, height) = (dimension("width")?, dimension("height")?);

    tree.set_attr(svg, "viewBox", format!("0 0 {width} {height}"));
    tree.remove_attr(svg, "width");
    tree.remove_attr(svg, "height");

    let inner = tree.create_element(Element::with_attrs(
        view::DIAGRAM_INNER,
        [("style", format!("max-width: {width}px").as_str())],
    ));
    tree.append(inner, svg);
    tree.append(diagram, inner);
    tree.add_class(diagram, "loaded");
    Ok(())
}
