use anyhow::Context as _;
use futures::future::{BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use quick_xml::escape::partial_escape;
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::SyntaxSet,
    util::LinesWithEndings,
};

use crate::render::Highlighter;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

/// Highlights code with syntect, producing `<span>`s with scope classes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntectHighlighter;

impl SyntectHighlighter {
    pub fn highlight_code(&self, code: &str, language: &str) -> anyhow::Result<String> {
        let Some(syntax) = SYNTAX_SET.find_syntax_by_token(language) else {
            log::debug!("No syntax definition for language {language:?}, leaving code unhighlighted");
            return Ok(partial_escape(code).into_owned());
        };
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .with_context(|| format!("Unable to highlight {language} code"))?;
        }
        Ok(generator.finalize())
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight<'a>(
        &'a self,
        code: &'a str,
        language: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<String>> {
        futures::future::ready(self.highlight_code(code, language)).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Tree;

    #[test]
    fn known_language() {
        let markup = SyntectHighlighter
            .highlight_code("fn main() {\n    let x = 1 < 2;\n}\n", "rust")
            .unwrap();
        assert!(markup.contains(r#"<span class="source rust">"#));
        assert!(Tree::parse(&markup).errors().is_empty());
        assert_eq!(
            Tree::parse(&markup).text_content(Tree::parse(&markup).root()),
            "fn main() {\n    let x = 1 < 2;\n}\n"
        );
    }

    #[test]
    fn unknown_language_is_escaped() {
        assert_eq!(
            SyntectHighlighter.highlight_code("a < b", "no-such-language").unwrap(),
            "a &lt; b"
        );
    }
}
