//! Interfaces of the sub-renderers that turn embedded languages into markup.
//!
//! Every renderer returns a markup fragment, which is parsed as XML and merged into the
//! document. A renderer error only affects the element it was asked to render.

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use quick_xml::escape::escape;

/// Options passed to a [`MathRenderer`].
#[derive(Debug, Clone, Copy)]
pub struct MathOptions<'a> {
    /// Display (block) rather than inline math.
    pub display: bool,
    /// Macro definitions, e.g. `\Real` → `{\mathset{R}}`.
    pub macros: &'a IndexMap<String, String>,
}

/// Typesets TeX math into markup.
pub trait MathRenderer: Send + Sync {
    fn render<'a>(&'a self, tex: &'a str, options: MathOptions<'a>)
        -> BoxFuture<'a, anyhow::Result<String>>;
}

/// Highlights source code, returning the highlighted code as markup.
pub trait Highlighter: Send + Sync {
    fn highlight<'a>(&'a self, code: &'a str, language: &'a str)
        -> BoxFuture<'a, anyhow::Result<String>>;
}

/// Converts diagram source text into an `<svg>` image.
pub trait DiagramRenderer: Send + Sync {
    fn to_svg<'a>(&'a self, source: &'a str) -> BoxFuture<'a, anyhow::Result<String>>;
}

/// Expands the shorthand content of an `mf-text` element into structural markup.
pub trait ExpandText: Send + Sync {
    fn expand(&self, text: &str) -> anyhow::Result<String>;
}

/// Keeps the TeX source of equations as text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TexSource;

impl MathRenderer for TexSource {
    fn render<'a>(
        &'a self,
        tex: &'a str,
        options: MathOptions<'a>,
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        let class = if options.display {
            "math-source display"
        } else {
            "math-source"
        };
        futures::future::ready(Ok(format!(r#"<span class="{class}">{}</span>"#, escape(tex))))
            .boxed()
    }
}
