//! Slug generation for project URLs.

/// Fallback used when a name has no usable characters.
pub const DEFAULT_SLUG: &str = "project";

/// Generate a slug from a project name.
///
/// Lowercases, replaces runs of non-alphanumeric characters with a single
/// hyphen, and trims hyphens at either end.
///
/// # Example
/// ```
/// use drumbeat::slug::slugify;
/// assert_eq!(slugify("Intro to Open Web!"), "intro-to-open-web");
/// ```
pub fn slugify(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev_hyphen = true; // Start true to skip leading hyphens

    for c in name.to_lowercase().chars() {
        if c.is_alphanumeric() {
            result.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            result.push('-');
            prev_hyphen = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        result
    }
}

/// Slugs that collide with fixed routes under `/projects`.
pub const RESERVED: [&str; 1] = ["create"];

/// Pick the first slug derived from `base` that is not in `taken`.
///
/// Tries `base`, then `base-2`, `base-3`, and so on. Reserved slugs are
/// always treated as taken.
pub fn first_free<S: AsRef<str>>(base: &str, taken: &[S]) -> String {
    let is_taken = |candidate: &str| {
        RESERVED.contains(&candidate) || taken.iter().any(|t| t.as_ref() == candidate)
    };

    if !is_taken(base) {
        return base.to_string();
    }

    (2..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
