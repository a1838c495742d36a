//! List parsing and formatting: the canonical string form of a List
//! value and its inverse parse (§8 "round-trip and idempotence").

use super::Obj;

/// Parse a Tcl-style list string into its elements. Elements are
/// separated by whitespace; a `{...}` group is taken verbatim (braces
/// balanced, backslash-newline does not end the group); a `"..."` group
/// allows embedded whitespace with backslash escapes processed; a bare
/// word runs until unescaped whitespace, with `\`-escapes processed.
pub fn parse_list(s: &str) -> Option<Vec<Obj>> {
    let mut out = Vec::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    let n = bytes.len();
    while i < n {
        while i < n && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i >= n {
            break;
        }
        if bytes[i] == b'{' {
            let start = i + 1;
            let mut depth = 1;
            i += 1;
            while i < n && depth > 0 {
                match bytes[i] {
                    b'{' => depth += 1,
                    b'}' => depth -= 1,
                    b'\\' if i + 1 < n => {
                        i += 1;
                    }
                    _ => {}
                }
                i += 1;
            }
            if depth != 0 {
                return None;
            }
            let end = i - 1;
            out.push(Obj::from_string(&s[start..end]));
        } else if bytes[i] == b'"' {
            let start = i + 1;
            i += 1;
            let mut buf = String::new();
            let mut closed = false;
            while i < n {
                match bytes[i] {
                    b'"' => {
                        closed = true;
                        i += 1;
                        break;
                    }
                    b'\\' if i + 1 < n => {
                        buf.push(bytes[i + 1] as char);
                        i += 2;
                    }
                    c => {
                        buf.push(c as char);
                        i += 1;
                    }
                }
            }
            if !closed {
                return None;
            }
            let _ = start;
            out.push(Obj::from_string(buf));
        } else {
            let start = i;
            let mut buf = String::new();
            while i < n && !(bytes[i] as char).is_whitespace() {
                if bytes[i] == b'\\' && i + 1 < n {
                    buf.push(bytes[i + 1] as char);
                    i += 2;
                } else {
                    buf.push(bytes[i] as char);
                    i += 1;
                }
            }
            let _ = start;
            out.push(Obj::from_string(buf));
        }
    }
    Some(out)
}

fn element_needs_braces(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    s.chars().any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '"' | '[' | ']' | '$' | ';' | '\\'))
}

/// Whether `s`'s own (unescaped) braces nest to zero with the depth
/// never going negative — the condition under which wrapping it in a
/// single outer `{...}` round-trips through [`parse_list`]'s brace-depth
/// counting. An element like `"a{b"` fails this (one open brace, no
/// close) and must fall back to backslash-style quoting instead.
fn braces_balanced(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 1,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
        i += 1;
    }
    depth == 0
}

fn brace_quote(s: &str) -> String {
    format!("{{{}}}", s)
}

/// Backslash-escape every metacharacter the bare-word branch of
/// [`parse_list`] treats specially (or that matters to a later reader
/// as a script word: `"`, `[`, `]`, `$`, `;`), producing a quoted bare
/// word instead of a brace group. Used whenever an element's own braces
/// don't balance, since `parse_list`'s `{...}` branch takes its content
/// verbatim and can't be escaped into submission the way a bare word
/// can (Tcl's `Tcl_ConvertElement` makes the same choice).
fn backslash_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_whitespace() || matches!(c, '{' | '}' | '"' | '[' | ']' | '$' | ';' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn format_element(s: &str) -> String {
    if !element_needs_braces(s) {
        return s.to_string();
    }
    if braces_balanced(s) && !s.ends_with('\\') {
        brace_quote(s)
    } else {
        backslash_quote(s)
    }
}

/// Format a vector of values as a canonical list string.
pub fn format_list(items: &[Obj]) -> String {
    items.iter().map(|item| format_element(&item.to_str())).collect::<Vec<_>>().join(" ")
}

/// Resolve an `end`/`end-k` index-like string against a length, clamping
/// to `[0, length]` (out-of-range reads are the caller's job to turn
/// into empty-result semantics, per §8 "`end-k` indices").
pub fn resolve_index(spec: &str, length: usize) -> Option<i64> {
    let spec = spec.trim();
    if spec == "end" {
        return Some(length as i64 - 1);
    }
    if let Some(rest) = spec.strip_prefix("end-") {
        let k: i64 = rest.parse().ok()?;
        return Some(length as i64 - 1 - k);
    }
    if let Some(rest) = spec.strip_prefix("end+") {
        let k: i64 = rest.parse().ok()?;
        return Some(length as i64 - 1 + k);
    }
    spec.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_simple() {
        let items = vec![Obj::from_string("1"), Obj::from_string("2"), Obj::from_string("3")];
        let s = format_list(&items);
        let back = parse_list(&s).unwrap();
        assert_eq!(back.len(), 3);
        assert_eq!(back[1].to_str(), "2");
    }

    #[test]
    fn round_trip_with_spaces_braces() {
        let items = vec![Obj::from_string("hello world"), Obj::from_string("a{b")];
        let s = format_list(&items);
        let back = parse_list(&s).unwrap();
        assert_eq!(back[0].to_str(), "hello world");
        assert_eq!(back[1].to_str(), "a{b");
    }

    #[test]
    fn round_trip_unbalanced_braces_and_trailing_backslash() {
        let items = vec![Obj::from_string("}b{"), Obj::from_string("trailing\\"), Obj::from_string("{balanced}")];
        let s = format_list(&items);
        let back = parse_list(&s).unwrap();
        assert_eq!(back[0].to_str(), "}b{");
        assert_eq!(back[1].to_str(), "trailing\\");
        assert_eq!(back[2].to_str(), "{balanced}");
    }

    #[test]
    fn empty_list_length_zero() {
        assert_eq!(parse_list("").unwrap().len(), 0);
    }

    #[test]
    fn end_k_indices_clamp() {
        assert_eq!(resolve_index("end", 5), Some(4));
        assert_eq!(resolve_index("end-2", 5), Some(2));
    }
}
