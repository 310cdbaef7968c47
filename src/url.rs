use std::borrow::Cow;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

#[rustfmt::skip]
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-').remove(b'_').remove(b'.').remove(b'!').remove(b'~').remove(b'*').remove(b'\'').remove(b'(').remove(b')');

#[rustfmt::skip]
const URI: &AsciiSet = &URI_COMPONENT
    // Characters that may be part of the URI syntax
    .remove(b';').remove(b'/').remove(b'?').remove(b':').remove(b'@').remove(b'&').remove(b'=').remove(b'+').remove(b'$').remove(b',').remove(b'#');

/// Percent-encode a string to be usable as a URI (matching Javascript's [`encodeURI()`]).
///
/// [`encodeURI()`]: https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/encodeURI#description
pub(crate) fn encode(s: &str) -> Cow<'_, str> {
    utf8_percent_encode(s, URI).into()
}

/// Percent-encode a string to be usable as a URI component (matching Javascript's
/// [`encodeURIComponent()`]).
///
/// [`encodeURIComponent()`]: https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Global_Objects/encodeURIComponent
pub(crate) fn encode_component(s: &str) -> Cow<'_, str> {
    utf8_percent_encode(s, URI_COMPONENT).into()
}

/// Absolute URLs (with a scheme) and root-relative paths are never resolved locally.
pub(crate) fn is_absolute(s: &str) -> bool {
    let scheme_len = s
        .bytes()
        .take_while(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        .count();
    s.starts_with('/') || (scheme_len > 0 && s[scheme_len..].starts_with(':'))
}
