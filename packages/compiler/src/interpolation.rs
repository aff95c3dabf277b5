//! Scanning of `{…}` interpolation markers.
//!
//! A marker starts at an unescaped `{` and ends at the matching `}`; braces
//! nested inside (object literals) and braces inside quoted strings are
//! balanced. `\{` and `\}` stand for literal braces. A blank marker `{}` is
//! kept as literal text.
//!
//! Braces that reach the output through a substitution or an escape are
//! written as character references, so compiled output never holds a marker.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'s> {
    Literal(String),
    Marker(&'s str),
    /// A brace written as `\{` or `\}`
    Escaped(char),
}

/// Byte offset of a `{` that is never closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unterminated(pub usize);

/// Whether the text may need rewriting (markers or escaped braces)
pub fn needs_rewrite(text: &str) -> bool {
    text.contains('{') || text.contains("\\}")
}

pub fn split_markers(text: &str) -> Result<Vec<Segment<'_>>, Unterminated> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        match c {
            '\\' if matches!(chars.get(i + 1), Some((_, '{' | '}'))) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Escaped(chars[i + 1].1));
                i += 2;
            }
            '{' => {
                let close = find_close(&chars, i)?;
                let close_offset = chars[close].0;
                let source = &text[offset + 1..close_offset];
                if source.trim().is_empty() {
                    literal.push_str(&text[offset..=close_offset]);
                } else {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Marker(source));
                }
                i = close + 1;
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn find_close(chars: &[(usize, char)], open: usize) -> Result<usize, Unterminated> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (j, (_, c)) in chars.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if *c == '\\' {
                escaped = true;
            } else if *c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(*c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(j);
                }
            }
            _ => {}
        }
    }
    Err(Unterminated(chars[open].0))
}

/// The expression inside a value that consists of exactly one marker,
/// surrounding whitespace aside
pub fn sole_marker(text: &str) -> Option<&str> {
    match split_markers(text.trim()).ok()?.as_slice() {
        [Segment::Marker(source)] => Some(*source),
        _ => None,
    }
}

/// `{` and `}` as character references
pub fn encode_braces(text: &str) -> String {
    text.replace('{', "&#123;").replace('}', "&#125;")
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Collapse leading and trailing whitespace runs to a single space each
pub fn normalize_edges(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return if text.is_empty() { String::new() } else { " ".to_string() };
    }
    let mut out = String::with_capacity(trimmed.len() + 2);
    if text.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(trimmed);
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out
}
