//! Backslash-escape substitution (§4.1 "Escape substitution").
//!
//! Performs exactly: `\a \b \f \n \r \t \v`, `\xHH` (1–2 hex), `\uHHHH`
//! (1–4 hex encoded to UTF-8), `\<newline><ws>* -> single space`,
//! `\ooo` (1–3 octal), and `\<any-other> -> <any-other>`.

pub fn substitute(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        if i + 1 >= chars.len() {
            out.push('\\');
            i += 1;
            continue;
        }
        let c = chars[i + 1];
        match c {
            'a' => {
                out.push('\u{7}');
                i += 2;
            }
            'b' => {
                out.push('\u{8}');
                i += 2;
            }
            'f' => {
                out.push('\u{c}');
                i += 2;
            }
            'n' => {
                out.push('\n');
                i += 2;
            }
            'r' => {
                out.push('\r');
                i += 2;
            }
            't' => {
                out.push('\t');
                i += 2;
            }
            'v' => {
                out.push('\u{b}');
                i += 2;
            }
            '\n' => {
                // \<newline><ws>* -> single space
                i += 2;
                while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                    i += 1;
                }
                out.push(' ');
            }
            'x' => {
                let mut j = i + 2;
                let mut digits = String::new();
                while j < chars.len() && digits.len() < 2 && chars[j].is_ascii_hexdigit() {
                    digits.push(chars[j]);
                    j += 1;
                }
                if digits.is_empty() {
                    out.push('x');
                    i += 2;
                } else {
                    let n = u32::from_str_radix(&digits, 16).unwrap_or(0);
                    out.push((n as u8) as char);
                    i = j;
                }
            }
            'u' => {
                let mut j = i + 2;
                let mut digits = String::new();
                while j < chars.len() && digits.len() < 4 && chars[j].is_ascii_hexdigit() {
                    digits.push(chars[j]);
                    j += 1;
                }
                if digits.is_empty() {
                    out.push('u');
                    i += 2;
                } else {
                    let n = u32::from_str_radix(&digits, 16).unwrap_or(0);
                    if let Some(ch) = char::from_u32(n) {
                        out.push(ch);
                    }
                    i = j;
                }
            }
            '0'..='7' => {
                let mut j = i + 1;
                let mut digits = String::new();
                while j < chars.len() && digits.len() < 3 && ('0'..='7').contains(&chars[j]) {
                    digits.push(chars[j]);
                    j += 1;
                }
                let n = u32::from_str_radix(&digits, 8).unwrap_or(0);
                out.push((n as u8) as char);
                i = j;
            }
            other => {
                out.push(other);
                i += 2;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_escapes() {
        assert_eq!(substitute("a\\nb"), "a\nb");
        assert_eq!(substitute("\\t\\t"), "\t\t");
        assert_eq!(substitute("\\\\"), "\\");
    }

    #[test]
    fn hex_and_unicode() {
        assert_eq!(substitute("\\x41"), "A");
        assert_eq!(substitute("\\u0041"), "A");
    }

    #[test]
    fn octal() {
        assert_eq!(substitute("\\101"), "A");
    }

    #[test]
    fn newline_continuation_collapses_to_space() {
        assert_eq!(substitute("a\\\n   b"), "a b");
    }

    #[test]
    fn unknown_escape_passes_through() {
        assert_eq!(substitute("\\q"), "q");
    }
}
