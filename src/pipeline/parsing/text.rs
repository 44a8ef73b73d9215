//! Small string helpers shared by the label parsers.

/// Title-case every alphabetic run: `high fructose corn-syrup` → `High Fructose Corn-Syrup`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Whole-term containment: `term` must not be glued to letters or digits on either side.
///
/// `contains_term("calcium 20 mg", "cal")` is false; `contains_term("120 cal", "cal")` is true.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = haystack[start..].find(term) {
        let begin = start + pos;
        let end = begin + term.len();
        let before_ok = haystack[..begin]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = begin + term.chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Lowercase, hyphens to spaces, whitespace collapsed: `Fat-Free!` → `fat free!`.
pub fn normalize_phrase(s: &str) -> String {
    s.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
