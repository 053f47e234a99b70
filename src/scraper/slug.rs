//! Title to URL-slug normalization.

use unicode_normalization::UnicodeNormalization;

/// Convert a series title into a URL path segment joined by `sep`.
///
/// Accents are decomposed and dropped (`"Señor"` -> `"senor"`), code points with
/// no ASCII decomposition are removed, and runs of whitespace, hyphens and
/// underscores become a single `sep`. Anything else that is not an ASCII
/// alphanumeric is stripped. The result never starts or ends with `sep`.
///
/// The transform is idempotent: `slugify(&slugify(t, s), s) == slugify(t, s)`.
pub fn slugify(title: &str, sep: char) -> String {
    let ascii: String = title.nfkd().filter(char::is_ascii).collect();
    let lowered = ascii.to_ascii_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    // Treat the start as a separator so leading separators are trimmed
    let mut prev_sep = true;
    for ch in lowered.chars() {
        let is_break = ch.is_whitespace() || ch == '-' || ch == '_' || ch == sep;
        if is_break {
            if !prev_sep {
                slug.push(sep);
            }
            prev_sep = true;
        } else if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_sep = false;
        }
    }

    if slug.ends_with(sep) {
        slug.pop();
    }
    slug
}
