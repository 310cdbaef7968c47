//! Element and attribute names of Foremark documents and of the markup this crate adds.

/// Tags of Foremark source documents.
pub mod mf {
    pub const DOCUMENT: &str = "mf-document";
    pub const TEXT: &str = "mf-text";
    pub const TITLE: &str = "mf-title";
    pub const ERROR: &str = "mf-error";
    pub const FIGURE: &str = "mf-figure";
    pub const FIGURE_CAPTION: &str = "mf-figure-caption";
    pub const NOTE: &str = "mf-note";
    pub const CITE: &str = "mf-cite";
    pub const REF: &str = "mf-ref";
    pub const EQUATION: &str = "mf-eq";
    pub const DISPLAY_EQUATION: &str = "mf-eq-display";
    pub const CODE: &str = "mf-code";
    pub const CODE_BLOCK: &str = "mf-codeblock";
    pub const DIAGRAM: &str = "mf-diagram";
    pub const MEDIA: &str = "mf-media";
    pub const ADMONITION: &str = "mf-admonition";
    pub const ADMONITION_TITLE: &str = "mf-admonition-title";
}

/// Tags introduced by the view transformation.
pub mod view {
    pub const FLOATING_ELEMENT_LABEL: &str = "mf-label";
    pub const SIDENOTE: &str = "mf-sidenote";
    pub const DIAGRAM_INNER: &str = "mf-diagram-inner";
    pub const CODE_LINE_HEAD: &str = "mf-code-line";
}

/// The attribute holding the language of `mf-code`.
pub const CODE_TYPE: &str = "type";

/// Prefix of the ids of sidenote surrogates.
pub const SIDENOTE_ID_PREFIX: &str = "sidenote.";
