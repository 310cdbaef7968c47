//! Renders [Foremark](https://github.com/yvt/foremark) documents into presentation-ready XHTML.
//!
//! The view transformation numbers and anchors headings, resolves cross-references, lays out
//! figures, notes and citations as sidenotes, adds ARIA attributes, and renders equations, code,
//! diagrams and media through pluggable renderers.

use std::{fs, path::Path};

use anyhow::{bail, Context as _};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

mod assets;
pub use assets::{AssetError, AssetOptions, DestinationDir, LocalAssets, LocalFile, PlannedCopy};

mod excerpt;
pub use excerpt::create_excerpt_html;

mod highlight;
pub use highlight::SyntectHighlighter;

mod load;

mod math;

mod media;
pub use media::{
    builtin_media_handlers, AssetResolver, HandleMedia, Html5Media, MediaContext, MediaElement,
    MediaError, MediaHandler, MediaHandlers, Pattern,
};

mod render;
pub use render::{DiagramRenderer, ExpandText, Highlighter, MathOptions, MathRenderer, TexSource};

mod tags;

mod tree;

mod url;

mod view;
pub use view::ViewerConfig;

use view::Diagnostics;

/// Configuration file contents.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Prefix headings with section numbers.
    #[serde(default)]
    pub heading_numbers: bool,
    #[serde(default)]
    pub math: MathConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MathConfig {
    /// Replaces the default (Markdeep) macros.
    #[serde(default = "defaults::math_macros")]
    pub macros: IndexMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MediaConfig {
    /// Keys of built-in media handlers to disable.
    #[serde(default)]
    pub disabled: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AssetsConfig {
    /// Directory (or `{name}`/`{hash}` template) that linked files are copied to.
    pub destination_dir: Option<String>,
    #[serde(default)]
    pub path_prefix: String,
}

mod defaults {
    use indexmap::IndexMap;

    pub fn math_macros() -> IndexMap<String, String> {
        crate::math::markdeep_macros()
    }
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            macros: defaults::math_macros(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Unable to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Unable to parse config file {}", path.display()))
    }

    pub fn viewer(&self) -> anyhow::Result<ViewerConfig> {
        let mut viewer = ViewerConfig {
            heading_numbers: self.heading_numbers,
            math_macros: self.math.macros.clone(),
            ..ViewerConfig::default()
        };
        for key in &self.media.disabled {
            let Some(handler) = viewer.media_handlers.get_mut(key) else {
                bail!("Unknown media handler `{key}` in [media] disabled");
            };
            *handler = None;
        }
        Ok(viewer)
    }

    pub fn asset_options(&self) -> anyhow::Result<AssetOptions> {
        let options = AssetOptions {
            destination_dir: (self.assets.destination_dir.as_deref()).map(DestinationDir::template),
        };
        options.validate().context("Invalid [assets] configuration")?;
        Ok(options)
    }

    /// Resolves files linked from the document at `document_path`.
    pub fn local_assets(&self, document_path: &str) -> anyhow::Result<LocalAssets> {
        let assets = LocalAssets::new(
            document_path,
            self.asset_options()?,
            self.assets.path_prefix.as_str(),
        )?;
        Ok(assets)
    }
}

/// A document rendered for viewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticForemark {
    /// The rendered `mf-document` element.
    pub html: String,
    pub title: Option<String>,
    pub lang: Option<String>,
    /// Problems that were reported inside the document.
    pub errors: Vec<String>,
}

/// Renders a Foremark document.
///
/// Problems with the document or with a renderer are shown inside the output and listed in
/// [`StaticForemark::errors`], so this never fails.
pub async fn convert_foremark_for_static_view(
    source: &str,
    config: &ViewerConfig,
    ctx: &MediaContext,
) -> StaticForemark {
    let mut diagnostics = Diagnostics::default();
    let load::Loaded {
        mut tree,
        root,
        lang,
    } = load::load(source, config.expand_text.as_deref(), &mut diagnostics);

    view::prepare_for_viewing(&mut tree, root, config, ctx, &mut diagnostics).await;

    let title = (tree.first_descendant(root, tags::mf::TITLE))
        .map(|title| tree.text_content(title).trim().to_owned());
    StaticForemark {
        html: tree.outer_xml(root),
        title,
        lang,
        errors: diagnostics.messages,
    }
}

#[cfg(test)]
mod tests;
