//! Checks on raw hcl that the parser cannot do for us
//!
//! - nesting depth, measured on the text before parsing because the parser itself recurses
//! - repeated object keys, which the parser silently merges (the first key stays, the last value
//!   wins)
use hcl_edit::expr::Object;
use hcl_edit::structure::Body;
use hcl_edit::visit::{visit_object, Visit};
use hcl_edit::Span;
use std::ops::Range;

enum Frame<'t> {
    /// `{`, `[` or `(`
    Group,
    /// `${` or `%{` inside a template
    Interpolation,
    Quoted,
    Heredoc(&'t str),
}

/// Byte offset of the first opening that nests deeper than `max_depth`
///
/// Counts brackets, braces, parentheses and template interpolations. Comments and template text
/// do not count.
pub(crate) fn nesting_exceeds(text: &str, max_depth: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut stack: Vec<Frame> = vec![];
    let mut depth = 0;
    let mut i = 0;

    while i < bytes.len() {
        match stack.last() {
            Some(Frame::Quoted) | Some(Frame::Heredoc(_)) => {
                let quoted = matches!(stack.last(), Some(Frame::Quoted));
                match (bytes[i], bytes.get(i + 1)) {
                    (b'\\', _) if quoted => i += 1,
                    // escaped `$${` and `%%{`
                    (b'$', Some(b'$')) | (b'%', Some(b'%')) => i += 1,
                    (b'$' | b'%', Some(b'{')) => {
                        depth += 1;
                        if depth > max_depth {
                            return Some(i);
                        }
                        stack.push(Frame::Interpolation);
                        i += 1;
                    }
                    (b'"', _) if quoted => {
                        stack.pop();
                    }
                    (b'\n', _) => {
                        if let Some(Frame::Heredoc(marker)) = stack.last() {
                            let line = text[i + 1..].lines().next().unwrap_or_default();
                            if line.trim() == *marker {
                                stack.pop();
                                i += line.len();
                            }
                        }
                    }
                    _ => {}
                }
            }
            _ => match bytes[i] {
                b'"' => stack.push(Frame::Quoted),
                b'#' => i = line_end(text, i),
                b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(text, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    i = text[i + 2..]
                        .find("*/")
                        .map_or(bytes.len(), |end| i + 2 + end + 1);
                }
                b'<' if bytes.get(i + 1) == Some(&b'<') => {
                    if let Some((marker, newline)) = heredoc_marker(text, i + 2) {
                        stack.push(Frame::Heredoc(marker));
                        // the newline is handled in heredoc state
                        i = newline - 1;
                    }
                }
                b'{' | b'[' | b'(' => {
                    depth += 1;
                    if depth > max_depth {
                        return Some(i);
                    }
                    stack.push(Frame::Group);
                }
                b'}' | b']' | b')' => {
                    if matches!(stack.last(), Some(Frame::Group | Frame::Interpolation)) {
                        stack.pop();
                        depth -= 1;
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }

    None
}

/// Offset of the newline ending the line at `from` (or the end of text)
fn line_end(text: &str, from: usize) -> usize {
    text[from..]
        .find('\n')
        .map_or(text.len(), |end| from + end)
        // the newline itself is not part of the comment
        .saturating_sub(1)
}

/// `<<EOT` or `<<-EOT` followed by a line break: the marker and the offset of the line break
fn heredoc_marker(text: &str, from: usize) -> Option<(&str, usize)> {
    let rest = &text[from..];
    let start = usize::from(rest.starts_with('-'));
    let len = rest[start..]
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len() - start);
    if len == 0 {
        return None;
    }

    let marker = &rest[start..start + len];
    let after = &rest[start + len..];
    let newline = after.trim_start_matches([' ', '\t', '\r']);
    newline
        .starts_with('\n')
        .then(|| (marker, from + start + len + (after.len() - newline.len())))
}

/// The first object key that the parser merged with a later occurrence of the same key
///
/// A merged entry keeps the span of the first key and the value of the last one, so anything
/// other than the assignment between the two spans gives the merge away.
pub(crate) fn merged_object_key(body: &Body, text: &str) -> Option<(Range<usize>, String)> {
    let mut visitor = MergedKeys { text, found: None };
    visitor.visit_body(body);
    visitor.found
}

struct MergedKeys<'t> {
    text: &'t str,
    found: Option<(Range<usize>, String)>,
}

impl Visit for MergedKeys<'_> {
    fn visit_object(&mut self, object: &Object) {
        if self.found.is_some() {
            return;
        }

        for (key, value) in object.iter() {
            let (Some(key_span), Some(value_span)) = (key.span(), value.expr().span()) else {
                continue;
            };
            let Some(between) = self.text.get(key_span.end..value_span.start) else {
                continue;
            };
            if !is_assignment(between) {
                let key = self.text.get(key_span.clone()).unwrap_or_default();
                let key = key.trim_matches('"').to_string();
                self.found = Some((key_span, key));
                return;
            }
        }

        visit_object(self, object);
    }
}

/// Whitespace and comments around a single `=` or `:`
fn is_assignment(text: &str) -> bool {
    let mut assignments = 0;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(comment) = rest.strip_prefix("/*") {
            rest = comment.split_once("*/").map_or("", |(_, after)| after);
            continue;
        }
        if rest.starts_with('#') || rest.starts_with("//") {
            rest = rest.split_once('\n').map_or("", |(_, after)| after);
            continue;
        }

        match c {
            '=' | ':' => assignments += 1,
            c if c.is_whitespace() => {}
            _ => return false,
        }
        rest = &rest[c.len_utf8()..];
    }

    assignments == 1
}
