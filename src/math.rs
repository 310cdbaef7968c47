use aho_corasick::AhoCorasick;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Named character references that HTML defines but XML does not.
const HTML_ONLY_ENTITIES: [(&str, &str); 8] = [
    ("&VeryThinSpace;", "\u{200a}"),
    ("&ThinSpace;", "\u{2009}"),
    ("&MediumSpace;", "\u{205f}"),
    ("&ThickSpace;", "\u{205f}\u{200a}"),
    ("&NegativeVeryThinSpace;", "\u{200b}"),
    ("&NegativeThinSpace;", "\u{200b}"),
    ("&NegativeMediumSpace;", "\u{200b}"),
    ("&NegativeThickSpace;", "\u{200b}"),
];

static ENTITIES: Lazy<AhoCorasick> =
    Lazy::new(|| AhoCorasick::new(HTML_ONLY_ENTITIES.map(|(entity, _)| entity)).unwrap());

static SVG_START_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<svg\b[^>]*>").unwrap());

/// Macros defined by Markdeep.
pub fn markdeep_macros() -> IndexMap<String, String> {
    [
        (r"\n", r"\hat{n}"),
        (r"\w", r"{\hat{\omega}}"),
        (r"\wi", r"{\w_\mathrm{i}}"),
        (r"\wo", r"{\w_\mathrm{o}}"),
        (r"\wh", r"{\w_\mathrm{h}}"),
        (r"\Li", r"{L_\mathrm{i}}"),
        (r"\Lo", r"{L_\mathrm{o}}"),
        (r"\Le", r"{L_\mathrm{e}}"),
        (r"\Lr", r"{L_\mathrm{r}}"),
        (r"\Lt", r"{L_\mathrm{t}}"),
        (r"\O", r"{\mathrm{O}}"),
        (r"\degrees", r"{{^{\large\circ}}}"),
        (r"\T", r"{\mathsf{T}}"),
        (r"\mathset", r"[1]{\mathbb{#1}}"),
        (r"\Real", r"{\mathset{R}}"),
        (r"\Integer", r"{\mathset{Z}}"),
        (r"\Boolean", r"{\mathset{B}}"),
        (r"\Complex", r"{\mathset{C}}"),
    ]
    .into_iter()
    .map(|(name, expansion)| (name.to_owned(), expansion.to_owned()))
    .collect()
}

/// Makes math renderer output well-formed XML: replaces HTML-only entities and puts inline
/// SVG images into the SVG namespace.
pub fn xhtmlify(markup: &str) -> String {
    let markup = ENTITIES.replace_all(markup, &HTML_ONLY_ENTITIES.map(|(_, text)| text));
    let markup = SVG_START_TAG.replace_all(&markup, |caps: &Captures<'_>| {
        let tag = &caps[0];
        if tag.contains("xmlns=") {
            tag.to_owned()
        } else {
            format!(r#"<svg xmlns="{SVG_NAMESPACE}"{}"#, &tag["<svg".len()..])
        }
    });
    markup.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_become_characters() {
        assert_eq!(
            xhtmlify("a&ThickSpace;b&NegativeThinSpace;c&amp;"),
            "a\u{205f}\u{200a}b\u{200b}c&amp;"
        );
    }

    #[test]
    fn svg_gets_namespace() {
        assert_eq!(
            xhtmlify(r#"<span><svg width="1"><path/></svg><svg xmlns="x"/></span>"#),
            r#"<span><svg xmlns="http://www.w3.org/2000/svg" width="1"><path/></svg><svg xmlns="x"/></span>"#
        );
    }

    #[test]
    fn markdeep_macro_table() {
        let macros = markdeep_macros();
        assert_eq!(macros.len(), 18);
        assert_eq!(macros[r"\Real"], r"{\mathset{R}}");
    }
}
