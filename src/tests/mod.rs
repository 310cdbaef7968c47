use std::{fmt, sync::Arc};

use crate::{
    convert_foremark_for_static_view, AssetResolver, MediaContext, StaticForemark, ViewerConfig,
};

pub struct Document {
    source: String,
    config: ViewerConfig,
    ctx: MediaContext,
}

impl Document {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            config: ViewerConfig::default(),
            ctx: MediaContext::default(),
        }
    }

    pub fn heading_numbers(mut self) -> Self {
        self.config.heading_numbers = true;
        self
    }

    pub fn config(mut self, config: ViewerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn assets(mut self, assets: Arc<dyn AssetResolver>) -> Self {
        self.ctx.assets = Some(assets);
        self
    }

    pub fn render(self) -> Rendered {
        Rendered(futures::executor::block_on(convert_foremark_for_static_view(
            &self.source,
            &self.config,
            &self.ctx,
        )))
    }
}

pub struct Rendered(StaticForemark);

impl Rendered {
    pub fn html(&self) -> &str {
        &self.0.html
    }
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let StaticForemark {
            html,
            title,
            lang,
            errors,
        } = &self.0;
        if let Some(title) = title {
            writeln!(f, "├─ title: {title}")?;
        }
        if let Some(lang) = lang {
            writeln!(f, "├─ lang: {lang}")?;
        }
        if !errors.is_empty() {
            writeln!(f, "├─ errors")?;
            for error in errors {
                writeln!(f, "│ {error}")?;
            }
        }
        writeln!(f, "├─ html")?;
        for line in html.lines() {
            writeln!(f, "{}", format!("│ {line}").trim_end())?;
        }
        Ok(())
    }
}


mod headings;
mod math;
mod media;
