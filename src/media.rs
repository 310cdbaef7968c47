//! `mf-media` handling: pick the best handler for a media URL and let it produce markup.

use std::{fmt, sync::Arc};

use futures::future::{BoxFuture, FutureExt};
use indexmap::IndexMap;
use quick_xml::escape::escape;
use regex::{Regex, RegexBuilder};

use crate::{
    tags::mf,
    tree::{Element, Tree},
    url,
};

/// Matches media URLs.
#[derive(Clone)]
pub enum Pattern {
    Regex(Regex),
    /// Called with the URL and the handler's options.
    Predicate(Arc<dyn Fn(&str, Option<&toml::Value>) -> bool + Send + Sync>),
}

/// The attributes of an `mf-media` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaElement {
    pub attrs: IndexMap<String, String>,
}

/// Turns an `mf-media` element into the markup that replaces it.
pub trait HandleMedia: Send + Sync {
    fn handle<'a>(
        &'a self,
        media: &'a MediaElement,
        ctx: &'a MediaContext,
        options: Option<&'a toml::Value>,
    ) -> BoxFuture<'a, anyhow::Result<String>>;
}

#[derive(Clone)]
pub struct MediaHandler {
    /// The handler is used for URLs matching any of these, or for every URL if `None`.
    pub patterns: Option<Vec<Pattern>>,
    pub handler: Arc<dyn HandleMedia>,
    pub options: Option<toml::Value>,
    /// Among matching handlers, the one with the highest priority wins.
    pub priority: i32,
}

/// Handlers by key, in registration order. `None` disables the key.
pub type MediaHandlers = IndexMap<String, Option<MediaHandler>>;

/// Maps URLs of local files to public URLs.
pub trait AssetResolver: Send + Sync {
    fn public_url(&self, src: &str) -> Option<String>;
}

/// Per-invocation data available to media handlers.
#[derive(Clone, Default)]
pub struct MediaContext {
    pub assets: Option<Arc<dyn AssetResolver>>,
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("<{}>: missing src", mf::MEDIA)]
    MissingSrc,
    #[error("<{}>: no matching media handler for media URL {url}", mf::MEDIA)]
    NoHandler { url: String },
    #[error("<{}>: processing failed for media URL {url}: {error:#}", mf::MEDIA)]
    Failed { url: String, error: anyhow::Error },
}

/// The HTML5 element a built-in handler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Html5Media {
    Image,
    Video,
    Audio,
}

impl Pattern {
    /// A case-insensitive regex.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self::Regex)
    }

    pub fn matches(&self, url: &str, options: Option<&toml::Value>) -> bool {
        match self {
            Self::Regex(regex) => regex.is_match(url),
            Self::Predicate(predicate) => predicate(url, options),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl fmt::Debug for MediaHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaHandler")
            .field("patterns", &self.patterns)
            .field("options", &self.options)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for MediaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaContext")
            .field("assets", &self.assets.is_some())
            .finish()
    }
}

impl MediaElement {
    pub fn src(&self) -> Option<&str> {
        self.attrs.get("src").map(String::as_str).filter(|src| !src.is_empty())
    }
}

impl MediaError {
    /// The content of the `mf-error` element shown in place of the media.
    pub fn to_markup(&self) -> String {
        let media = format!("<code>&lt;{}&gt;</code>", mf::MEDIA);
        match self {
            Self::MissingSrc => format!("{media}: missing <code>src</code>"),
            Self::NoHandler { url } => format!(
                "{media}: no matching media handler for media URL <code>{}</code>",
                escape(url)
            ),
            Self::Failed { url, error } => format!(
                "{media}: processing failed for media URL <code>{}</code>: <code>{}</code>",
                escape(url),
                escape(&format!("{error:#}"))
            ),
        }
    }
}

/// The handlers for images, videos and audio.
pub fn builtin_media_handlers() -> MediaHandlers {
    let builtin = |media, patterns: Option<&str>, priority| {
        Some(MediaHandler {
            patterns: patterns.map(|pattern| vec![Pattern::regex(pattern).unwrap()]),
            handler: Arc::new(media),
            options: None,
            priority,
        })
    };
    IndexMap::from([
        ("image".to_owned(), builtin(Html5Media::Image, None, 0)),
        (
            "video".to_owned(),
            builtin(
                Html5Media::Video,
                Some(r"\.(mp4|m4v|ogm|ogv|avi|pg|mov|wmv|webm)$"),
                20,
            ),
        ),
        (
            "audio".to_owned(),
            builtin(
                Html5Media::Audio,
                Some(r"\.(mp3|ogg|oga|spx|wav|au|opus|m4a|wma)$"),
                10,
            ),
        ),
    ])
}

/// Picks the matching handler with the highest priority. Ties go to the first registered one.
pub fn select_handler<'a>(handlers: &'a MediaHandlers, url: &str) -> Option<&'a MediaHandler> {
    let mut best: Option<&MediaHandler> = None;
    for handler in handlers.values().flatten() {
        let matches = handler.patterns.as_ref().map_or(true, |patterns| {
            (patterns.iter()).any(|pattern| pattern.matches(url, handler.options.as_ref()))
        });
        if matches && best.map_or(true, |best| handler.priority > best.priority) {
            best = Some(handler);
        }
    }
    best
}

/// Produces the markup replacing an `mf-media` element.
pub async fn render_media(
    media: &MediaElement,
    handlers: &MediaHandlers,
    ctx: &MediaContext,
) -> Result<String, MediaError> {
    let url = media.src().ok_or(MediaError::MissingSrc)?;
    let handler = select_handler(handlers, url).ok_or_else(|| MediaError::NoHandler {
        url: url.to_owned(),
    })?;
    handler
        .handler
        .handle(media, ctx, handler.options.as_ref())
        .await
        .map_err(|error| MediaError::Failed {
            url: url.to_owned(),
            error,
        })
}

impl Html5Media {
    fn tag(self) -> &'static str {
        match self {
            Self::Image => "img",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    fn element(self, media: &MediaElement, ctx: &MediaContext) -> String {
        let mut element = Element::new(self.tag());
        if self != Self::Image {
            element.attrs.set("controls", "controls");
        }
        for (name, value) in &media.attrs {
            element.attrs.set(name, value.as_str());
        }

        let public_url = (media.src())
            .filter(|src| !url::is_absolute(src))
            .and_then(|src| ctx.assets.as_ref()?.public_url(src));
        if let Some(public_url) = public_url {
            element.attrs.set("src", public_url);
        }

        let mut tree = Tree::new();
        let element = tree.create_element(element);
        tree.outer_xml(element)
    }
}

impl HandleMedia for Html5Media {
    fn handle<'a>(
        &'a self,
        media: &'a MediaElement,
        ctx: &'a MediaContext,
        _options: Option<&'a toml::Value>,
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        futures::future::ready(Ok(self.element(media, ctx))).boxed()
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    struct Fixed(&'static str);

    impl HandleMedia for Fixed {
        fn handle<'a>(
            &'a self,
            _media: &'a MediaElement,
            _ctx: &'a MediaContext,
            _options: Option<&'a toml::Value>,
        ) -> BoxFuture<'a, anyhow::Result<String>> {
            futures::future::ready(Ok(self.0.to_owned())).boxed()
        }
    }

    struct Failing;

    impl HandleMedia for Failing {
        fn handle<'a>(
            &'a self,
            _media: &'a MediaElement,
            _ctx: &'a MediaContext,
            _options: Option<&'a toml::Value>,
        ) -> BoxFuture<'a, anyhow::Result<String>> {
            futures::future::ready(Err(anyhow::anyhow!("<broken> file"))).boxed()
        }
    }

    fn handler(markup: &'static str, patterns: Option<&str>, priority: i32) -> Option<MediaHandler> {
        Some(MediaHandler {
            patterns: patterns.map(|pattern| vec![Pattern::regex(pattern).unwrap()]),
            handler: Arc::new(Fixed(markup)),
            options: None,
            priority,
        })
    }

    fn media(src: &str) -> MediaElement {
        MediaElement {
            attrs: IndexMap::from([("src".to_owned(), src.to_owned())]),
        }
    }

    fn render(handlers: &MediaHandlers, src: &str) -> Result<String, MediaError> {
        block_on(render_media(&media(src), handlers, &MediaContext::default()))
    }

    #[test]
    fn highest_priority_wins_and_ties_go_to_first() {
        let handlers = IndexMap::from([
            ("fallback".to_owned(), handler("fallback", None, 0)),
            ("first".to_owned(), handler("first", Some(r"\.png$"), 5)),
            ("second".to_owned(), handler("second", Some(r"\.png$"), 5)),
            ("disabled".to_owned(), None),
        ]);
        assert_eq!(render(&handlers, "a.PNG").unwrap(), "first");
        assert_eq!(render(&handlers, "a.svg").unwrap(), "fallback");
    }

    #[test]
    fn builtin_handlers() {
        let handlers = builtin_media_handlers();
        assert_eq!(
            render(&handlers, "clip.webm").unwrap(),
            r#"<video controls="controls" src="clip.webm"></video>"#
        );
        assert_eq!(
            render(&handlers, "song.MP3").unwrap(),
            r#"<audio controls="controls" src="song.MP3"></audio>"#
        );
        assert_eq!(render(&handlers, "photo.jpg").unwrap(), r#"<img src="photo.jpg" />"#);
    }

    #[test]
    fn errors() {
        let handlers = IndexMap::from([("png".to_owned(), handler("png", Some(r"\.png$"), 0))]);
        let err = block_on(render_media(
            &MediaElement::default(),
            &handlers,
            &MediaContext::default(),
        ))
        .unwrap_err();
        assert_eq!(err.to_markup(), "<code>&lt;mf-media&gt;</code>: missing <code>src</code>");

        let err = render(&handlers, "a&b.gif").unwrap_err();
        assert_eq!(err.to_string(), "<mf-media>: no matching media handler for media URL a&b.gif");
        assert_eq!(
            err.to_markup(),
            "<code>&lt;mf-media&gt;</code>: no matching media handler for media URL <code>a&amp;b.gif</code>"
        );

        let failing = IndexMap::from([(
            "failing".to_owned(),
            Some(MediaHandler {
                patterns: None,
                handler: Arc::new(Failing),
                options: None,
                priority: 0,
            }),
        )]);
        assert_eq!(
            render(&failing, "a.png").unwrap_err().to_markup(),
            "<code>&lt;mf-media&gt;</code>: processing failed for media URL <code>a.png</code>: <code>&lt;broken&gt; file</code>"
        );
    }

    #[test]
    fn local_media_is_resolved() {
        struct Public;
        impl AssetResolver for Public {
            fn public_url(&self, src: &str) -> Option<String> {
                Some(format!("/public/{src}"))
            }
        }
        let ctx = MediaContext {
            assets: Some(Arc::new(Public)),
        };
        let handlers = builtin_media_handlers();
        let markup = |src: &str| block_on(render_media(&media(src), &handlers, &ctx)).unwrap();
        assert_eq!(markup("a.png"), r#"<img src="/public/a.png" />"#);
        assert_eq!(markup("/a.png"), r#"<img src="/a.png" />"#);
    }
}
