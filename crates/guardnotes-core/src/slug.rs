//! Identifier derivation.
//!
//! Project slugs and group tags are pure functions of the human-readable
//! name. Both are idempotent: feeding an output back in returns it unchanged.

/// Maximum length of a group tag.
pub const MAX_TAG_LEN: usize = 24;

/// Derive a URL-safe slug from a name.
///
/// Lowercases, turns runs of whitespace, `-` and `_` into a single `-`,
/// drops every other character outside `[a-z0-9]` and trims `-` from both
/// ends.
///
/// ```
/// # use guardnotes_core::slug::slugify;
/// assert_eq!(slugify("My Cool Project!"), "my-cool-project");
/// ```
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() || c == '-' || c == '_' {
            pending_separator = true;
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        }
    }

    slug
}

/// Derive a short tag for a group: its slug cut to [`MAX_TAG_LEN`]
/// characters, without a dangling `-`.
#[must_use]
pub fn tagify(name: &str) -> String {
    let mut tag = slugify(name);
    // Slugs are ASCII, so byte truncation is a char boundary.
    tag.truncate(MAX_TAG_LEN);
    while tag.ends_with('-') {
        tag.pop();
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_of_spec_example() {
        assert_eq!(slugify("My Cool Project!"), "my-cool-project");
    }

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(slugify("  api -- gateway__v2  "), "api-gateway-v2");
    }

    #[test]
    fn slug_drops_punctuation_inside_words() {
        assert_eq!(slugify("Ops/Infra (EU)"), "opsinfra-eu");
    }

    #[test]
    fn slug_drops_non_ascii_letters() {
        assert_eq!(slugify("Producción"), "produccin");
    }

    #[test]
    fn slug_of_symbols_only_is_empty() {
        assert_eq!(slugify("!!! ???"), "");
    }

    #[test]
    fn slug_is_idempotent() {
        for name in ["My Cool Project!", "  a  b ", "x_y-z", "Ünïcödé 42", "--"] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "not idempotent for {name:?}");
            assert_eq!(slugify(name), once, "not deterministic for {name:?}");
        }
    }

    #[test]
    fn tag_is_bounded_and_has_no_trailing_dash() {
        let tag = tagify("Payments Reconciliation Service Backend");
        assert!(tag.len() <= MAX_TAG_LEN);
        assert!(!tag.ends_with('-'));
        assert_eq!(tag, "payments-reconciliation");
    }

    #[test]
    fn tag_is_idempotent() {
        for name in ["Backend", "Payments Reconciliation Service Backend", "a b c"] {
            let once = tagify(name);
            assert_eq!(tagify(&once), once);
        }
    }
}
