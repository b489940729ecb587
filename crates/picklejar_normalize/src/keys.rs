//! Dict key stringification.
//!
//! JSON objects only have string keys. Scalars are rendered the way a JSON
//! encoder renders them; tuples, frozensets and bytes get a readable
//! Python-style rendering. Rendering walks the key with an explicit stack.

use std::fmt::Write;

use picklejar_foundation::Value;

/// One step of rendering a composite key.
enum Piece<'v> {
    Value(&'v Value),
    Text(&'static str),
}

/// Renders a dict key as a JSON object key.
#[must_use]
pub fn key_string(key: &Value) -> String {
    match key {
        Value::Str(s) => s.to_string(),
        Value::None => "null".to_string(),
        _ => render(key),
    }
}

fn float_text(f: f64, nested: bool) -> String {
    let text = match (f.is_nan(), f.is_infinite(), f > 0.0, nested) {
        (true, _, _, false) => "NaN",
        (true, _, _, true) => "nan",
        (_, true, true, false) => "Infinity",
        (_, true, false, false) => "-Infinity",
        (_, true, true, true) => "inf",
        (_, true, false, true) => "-inf",
        _ => return float_repr(f),
    };
    text.to_string()
}

/// Shortest round-trip spelling of a finite float, as Python's `repr` and
/// `json.dumps` write it: positional for decimal exponents in `-4..16`,
/// otherwise `d.ddde+XX` with at least two exponent digits.
fn float_repr(f: f64) -> String {
    let scientific = format!("{:e}", f.abs());
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let (first, rest) = digits.split_at(1);

    let mut out = String::with_capacity(digits.len() + 8);
    if f.is_sign_negative() {
        out.push('-');
    }
    if (-4..16).contains(&exponent) {
        if exponent < 0 {
            out.push_str("0.");
            out.extend(std::iter::repeat_n('0', exponent.unsigned_abs() as usize - 1));
            out.push_str(&digits);
        } else {
            let whole = exponent.unsigned_abs() as usize + 1;
            if digits.len() <= whole {
                out.push_str(&digits);
                out.extend(std::iter::repeat_n('0', whole - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..whole]);
                out.push('.');
                out.push_str(&digits[whole..]);
            }
        }
    } else {
        out.push_str(first);
        if !rest.is_empty() {
            out.push('.');
            out.push_str(rest);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{sign}{:02}", exponent.unsigned_abs());
    }
    out
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn push_bytes(out: &mut String, bytes: &[u8]) {
    out.push_str("b'");
    for &b in bytes {
        match b {
            b'\'' => out.push_str("\\'"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push('\'');
}

/// Renders `root`. Top-level scalars follow JSON key conventions; anything
/// nested inside a tuple or frozenset follows Python's repr.
fn render(root: &Value) -> String {
    let mut out = String::new();
    let mut stack = vec![(Piece::Value(root), false)];

    while let Some((piece, nested)) = stack.pop() {
        let value = match piece {
            Piece::Text(text) => {
                out.push_str(text);
                continue;
            }
            Piece::Value(value) => value,
        };
        match value {
            Value::None => out.push_str(if nested { "None" } else { "null" }),
            Value::Bool(b) => out.push_str(match (*b, nested) {
                (true, false) => "true",
                (false, false) => "false",
                (true, true) => "True",
                (false, true) => "False",
            }),
            Value::Int(n) => {
                let _ = write!(out, "{n}");
            }
            Value::BigInt(n) => {
                let _ = write!(out, "{n}");
            }
            Value::Float(f) => out.push_str(&float_text(*f, nested)),
            Value::Str(s) if nested => push_quoted(&mut out, s),
            Value::Str(s) => out.push_str(s),
            Value::Bytes(bytes) => push_bytes(&mut out, bytes),
            Value::Dtype(dtype) => out.push_str(&dtype.name()),
            Value::Global(reference) => {
                let _ = write!(out, "{reference}");
            }
            Value::Tuple(items) | Value::List(items) => {
                let (open, close) = if matches!(value, Value::Tuple(_)) { ("(", ")") } else { ("[", "]") };
                out.push_str(open);
                stack.push((Piece::Text(close), true));
                if items.len() == 1 && close == ")" {
                    stack.push((Piece::Text(","), true));
                }
                push_items(&mut stack, items.iter());
            }
            Value::Set(members) => {
                if members.is_empty() {
                    out.push_str("frozenset()");
                    continue;
                }
                out.push_str("frozenset({");
                stack.push((Piece::Text("})"), true));
                push_items(&mut stack, members.iter());
            }
            Value::Dict(map) => {
                out.push('{');
                stack.push((Piece::Text("}"), true));
                let mut pieces = Vec::with_capacity(map.len() * 4);
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        pieces.push(Piece::Text(", "));
                    }
                    pieces.extend([Piece::Value(k), Piece::Text(": "), Piece::Value(v)]);
                }
                stack.extend(pieces.into_iter().rev().map(|p| (p, true)));
            }
            Value::Array(array) => {
                let _ = write!(out, "array(dtype={}, shape={:?})", array.dtype(), array.shape());
            }
        }
    }
    out
}

/// Pushes `items` separated by commas, so they pop in order.
fn push_items<'v>(stack: &mut Vec<(Piece<'v>, bool)>, items: impl DoubleEndedIterator<Item = &'v Value> + ExactSizeIterator) {
    for (i, item) in items.enumerate().rev() {
        stack.push((Piece::Value(item), true));
        if i > 0 {
            stack.push((Piece::Text(", "), true));
        }
    }
}
