//! Slug generation
//!
//! Slugs are the human-readable identifiers of types and records. The
//! backend derives the same shape server-side, so locally generated slugs
//! line up with what it would have assigned.

/// Convert a title into a slug
///
/// Lowercases ASCII alphanumerics, collapses every run of other characters
/// into a single `-`, and trims leading/trailing separators.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}
