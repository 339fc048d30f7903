use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: char = '…';

/// Truncate `s` to at most `max_width` terminal columns, ending in `…` when cut.
///
/// Borrows when the string already fits.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if UnicodeWidthStr::width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    // Reserve one column for the ellipsis
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::with_capacity(max_width + 2);
    for c in s.chars() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push(ELLIPSIS);
    Cow::Owned(out)
}

/// Remove terminal control characters and ANSI escape sequences.
///
/// Repository descriptions and READMEs are remote input; an embedded escape
/// sequence must never reach the terminal. Tab and newline survive.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let is_unsafe = |c: char| c == '\x1b' || (c.is_control() && c != '\t' && c != '\n');
    if !s.chars().any(is_unsafe) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                // CSI: parameters until a final byte in @..~
                Some('[') => {
                    chars.next();
                    for n in chars.by_ref() {
                        if ('@'..='~').contains(&n) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ST
                Some(']') => {
                    chars.next();
                    while let Some(n) = chars.next() {
                        if n == '\x07' {
                            break;
                        }
                        if n == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            c if is_unsafe(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Short count for narrow columns: `999`, `1.2k`, `25k`, `3.4M`, `1.2B`.
///
/// Digits are truncated, never rounded, so a value stays in its own unit.
pub fn compact_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=9_999 => one_decimal(n, 1_000, 'k'),
        10_000..=999_999 => format!("{}k", n / 1_000),
        1_000_000..=999_999_999 => one_decimal(n, 1_000_000, 'M'),
        _ => one_decimal(n, 1_000_000_000, 'B'),
    }
}

fn one_decimal(n: u64, unit: u64, suffix: char) -> String {
    format!("{}.{}{suffix}", n / unit, n % unit / (unit / 10))
}
