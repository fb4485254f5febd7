use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

/// Normalize whitespace in a line.
pub fn normalize_whitespace(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

static DIAGNOSTIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:<interactive>|\S+\.l?hs):(?:\d+:\d+(?:-\d+)?|\(\d+,\d+\)-\(\d+,\d+\)): (error|warning):",
    )
    .expect("must compile")
});

/// Check if a line is a ghci diagnostic rather than regular output.
/// Diagnostics start at the first column, so printed values that merely
/// contain the word `error:` do not count.
pub fn is_error_line(line: &str) -> bool {
    line.starts_with("*** Exception:")
        || line.starts_with("<no location info>: error:")
        || DIAGNOSTIC_RE
            .captures(line)
            .is_some_and(|caps| &caps[1] == "error")
}

fn is_warning_header(line: &str) -> bool {
    DIAGNOSTIC_RE
        .captures(line)
        .is_some_and(|caps| &caps[1] == "warning")
}

/// True if any line of the buffer reports an error.
pub fn contains_error(output: &VecDeque<String>) -> bool {
    output.iter().any(|line| is_error_line(line))
}

/// Remove warning blocks (the located header and its indented body) and
/// return them. Warnings come ahead of the answer and are never part of it.
pub fn strip_warnings(output: &mut VecDeque<String>) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut kept = VecDeque::with_capacity(output.len());
    let mut in_warning = false;

    for line in output.drain(..) {
        let continues =
            in_warning && (line.trim().is_empty() || line.starts_with(char::is_whitespace));
        in_warning = continues || is_warning_header(&line);
        if in_warning {
            warnings.push(line);
        } else {
            kept.push_back(line);
        }
    }
    *output = kept;
    warnings
}

/// Index of the first non blank line at or after `from`.
pub fn skip_blank(output: &VecDeque<String>, from: usize) -> usize {
    let mut i = from;
    while i < output.len() && output[i].trim().is_empty() {
        i += 1;
    }
    i
}

/// Read one logical entry starting at `start`: ghci wraps long types and values
/// onto indented continuation lines. Returns the joined entry and the index of
/// the first line after it.
pub fn take_entry(output: &VecDeque<String>, start: usize) -> Option<(String, usize)> {
    let first = output.get(start)?;
    let mut entry = first.trim().to_string();
    let mut next = start + 1;
    while let Some(line) = output.get(next) {
        if line.trim().is_empty() || !line.starts_with(char::is_whitespace) {
            break;
        }
        entry.push(' ');
        entry.push_str(line.trim());
        next += 1;
    }
    Some((normalize_whitespace(&entry), next))
}

/// Split at the first ` :: ` that is not nested inside brackets, so that
/// `(1 :: Int) :: Int` splits after the closing parenthesis.
pub fn split_type_annotation(entry: &str) -> Option<(&str, &str)> {
    const SEP: &str = " :: ";
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in entry.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '(' | '[' | '{' if !in_string => depth += 1,
            ')' | ']' | '}' if !in_string => depth -= 1,
            ' ' if !in_string && depth == 0 && entry[i..].starts_with(SEP) => {
                return Some((&entry[..i], &entry[i + SEP.len()..]));
            }
            _ => {}
        }
    }
    None
}

/// Decode a Haskell string literal as printed by `show`.
/// Returns `None` if `literal` is not a complete string literal.
pub fn unescape_haskell_string(literal: &str) -> Option<String> {
    let inner = literal.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            if ch == '"' {
                return None;
            }
            out.push(ch);
            continue;
        }

        let escape = chars.next()?;
        match escape {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            // empty escape, separates a numeric escape from following digits
            '&' => {}
            '^' => {
                let ctrl = chars.next()?;
                out.push(char::from_u32((ctrl as u32).checked_sub(64)?)?);
            }
            'x' => out.push(take_numeric(&mut chars, 16)?),
            'o' => out.push(take_numeric(&mut chars, 8)?),
            d if d.is_ascii_digit() => {
                let mut value = d.to_digit(10)?;
                while let Some(next) = chars.peek().and_then(|c| c.to_digit(10)) {
                    value = value.checked_mul(10)?.checked_add(next)?;
                    chars.next();
                }
                out.push(char::from_u32(value)?);
            }
            c if c.is_whitespace() => {
                // string gap: backslash, whitespace, backslash
                while let Some(gap) = chars.next() {
                    if gap == '\\' {
                        break;
                    }
                }
            }
            c if c.is_ascii_uppercase() => {
                let mut name = String::from(c);
                while let Some(next) = chars.peek().filter(|c| c.is_ascii_uppercase()) {
                    name.push(*next);
                    chars.next();
                }
                out.push(ascii_control(&name)?);
            }
            _ => return None,
        }
    }

    Some(out)
}

fn take_numeric(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, radix: u32) -> Option<char> {
    let mut value: u32 = 0;
    let mut digits = 0;
    while let Some(digit) = chars.peek().and_then(|c| c.to_digit(radix)) {
        value = value.checked_mul(radix)?.checked_add(digit)?;
        digits += 1;
        chars.next();
    }
    if digits == 0 {
        return None;
    }
    char::from_u32(value)
}

fn ascii_control(name: &str) -> Option<char> {
    const NAMES: [&str; 33] = [
        "NUL", "SOH", "STX", "ETX", "EOT", "ENQ", "ACK", "BEL", "BS", "HT", "LF", "VT", "FF",
        "CR", "SO", "SI", "DLE", "DC1", "DC2", "DC3", "DC4", "NAK", "SYN", "ETB", "CAN", "EM",
        "SUB", "ESC", "FS", "GS", "RS", "US", "SP",
    ];
    if name == "DEL" {
        return Some('\u{7f}');
    }
    let code = NAMES.iter().position(|n| *n == name)?;
    char::from_u32(code as u32)
}
