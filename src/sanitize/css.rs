//! Style text filter for user-configured CSS
//!
//! Removes literal patterns that could break out of an inline `<style>` block
//! or execute code. This is a pattern filter, not a CSS parser: it is a floor,
//! not a proof of safety.

/// How far a matched pattern extends
#[derive(Clone, Copy)]
enum Extent {
    /// Just the pattern itself
    Pattern,
    /// Through the first of these characters (inclusive), or to the end
    Through(&'static [char]),
}

/// Patterns stripped from style text, matched case-insensitively
const RULES: &[(&str, Extent)] = &[
    ("<style", Extent::Through(&['>'])),
    ("</style", Extent::Through(&['>'])),
    ("<script", Extent::Through(&['>'])),
    ("</script", Extent::Through(&['>'])),
    ("javascript:", Extent::Pattern),
    ("@import", Extent::Through(&[';', '\n'])),
    ("<!--", Extent::Pattern),
    ("-->", Extent::Pattern),
];

/// Strip unsafe constructs from style text before it is inlined into the page.
///
/// Removal repeats until nothing changes, so input that reassembles a pattern
/// after one pass (`<scr<script>ipt>`) is still caught and the result is stable
/// under a second call.
pub fn sanitize_css(input: &str) -> String {
    let mut current = input.to_string();
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn strip_once(input: &str) -> String {
    let mut text = input.to_string();
    for (pattern, extent) in RULES {
        text = remove_all(&text, pattern, *extent);
    }
    remove_expressions(&text)
}

/// Remove every occurrence of `pattern` (ASCII case-insensitive) and its extent.
fn remove_all(text: &str, pattern: &str, extent: Extent) -> String {
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;

    while let Some(found) = lower[pos..].find(pattern) {
        let start = pos + found;
        let after = start + pattern.len();
        out.push_str(&text[pos..start]);
        pos = match extent {
            Extent::Pattern => after,
            Extent::Through(stops) => text[after..]
                .find(stops)
                .map(|i| after + i + 1)
                .unwrap_or(text.len()),
        };
    }
    out.push_str(&text[pos..]);
    out
}

/// Remove `expression` followed by optional whitespace and a parenthesized body.
fn remove_expressions(text: &str) -> String {
    const KEYWORD: &str = "expression";
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    let mut search = 0;

    while let Some(found) = lower[search..].find(KEYWORD) {
        let start = search + found;
        let after_keyword = start + KEYWORD.len();
        let rest = &text[after_keyword..];
        let open = after_keyword + (rest.len() - rest.trim_start().len());

        if text[open..].starts_with('(') {
            out.push_str(&text[pos..start]);
            pos = closing_paren(text, open + 1);
            search = pos;
        } else {
            search = after_keyword;
        }
    }
    out.push_str(&text[pos..]);
    out
}

/// Byte offset just past the `)` balancing an already-consumed `(`.
fn closing_paren(text: &str, from: usize) -> usize {
    let mut depth = 1usize;
    for (i, c) in text[from..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return from + i + 1;
                }
            }
            _ => {}
        }
    }
    text.len()
}
