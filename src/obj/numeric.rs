//! Integer/double parsing and coercion rules (§4.5.3, §8 boundary behaviours).

/// Parsed numeric literal, used by both the expression lexer and `expr`'s
/// string->number coercions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Double(f64),
}

/// Parse a Tcl/Jim integer literal: decimal, `0x`/`0X` hex, and `0`-prefixed
/// octal *only* when the digits that follow are all in `0..=7` and there is
/// more than just the leading zero (a bare `"0"` is decimal zero, and
/// `"08"` is decimal 8, matching "leading zero alone is decimal").
/// Overflow is reported as `None`, never silently wrapped (§8).
pub fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let (neg, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    if body.is_empty() {
        return None;
    }
    let value: i64 = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        i64::from_str_radix(hex, 16).ok()?
    } else if body.len() > 1 && body.starts_with('0') && body[1..].chars().all(|c| ('0'..='7').contains(&c)) {
        i64::from_str_radix(&body[1..], 8).ok()?
    } else {
        if !body.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        body.parse::<i64>().ok()?
    };
    Some(if neg { value.checked_neg()? } else { value })
}

/// Parse a double literal, including the irrationals `Inf`/`NaN`
/// (case-insensitive, §4.1).
pub fn parse_double(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    let lower = t.to_ascii_lowercase();
    let (neg, body) = match lower.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, lower.strip_prefix('+').unwrap_or(&lower)),
    };
    if body == "inf" || body == "infinity" {
        return Some(if neg { f64::NEG_INFINITY } else { f64::INFINITY });
    }
    if body == "nan" {
        return Some(f64::NAN);
    }
    t.parse::<f64>().ok()
}

/// Coerce a string to a [`Number`], preferring integer when the literal is
/// unambiguously an integer. Used for `expr`'s numeric-promotion rules.
pub fn parse_number(s: &str) -> Option<Number> {
    if let Some(i) = parse_int(s) {
        return Some(Number::Int(i));
    }
    parse_double(s).map(Number::Double)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_and_leading_zero() {
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("08"), Some(8));
        assert_eq!(parse_int("08"), Some(8)); // leading zero alone is decimal
        assert_eq!(parse_int("-5"), Some(-5));
    }

    #[test]
    fn octal_and_hex() {
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("0X10"), Some(16));
    }

    #[test]
    fn overflow_is_none_not_wrapped() {
        assert_eq!(parse_int("99999999999999999999"), None);
    }

    #[test]
    fn irrationals_case_insensitive() {
        assert_eq!(parse_double("inf"), Some(f64::INFINITY));
        assert_eq!(parse_double("-INF"), Some(f64::NEG_INFINITY));
        assert!(parse_double("NaN").unwrap().is_nan());
    }
}
