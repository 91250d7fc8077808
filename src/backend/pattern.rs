//! Key Pattern Module
//!
//! Redis-style key patterns (`*`, `?`, `[...]`, `[^...]`, `\` escapes)
//! compiled onto [`glob::Pattern`].
//!
//! Redis accepts every pattern: `*` runs collapse to one `*`, an unclosed
//! class runs to the end of the pattern, and a trailing `\` is literal. The
//! translation below keeps those rules and emits a glob that always parses.

use std::fmt;

use crate::error::{CacheError, Result};

/// Matches every char; negated, it matches nothing.
const ALL_CHARS: (char, char) = ('\u{0}', char::MAX);

/// Chars that cannot appear freely inside a glob class.
const CLASS_SPECIALS: [char; 3] = ['!', '-', ']'];

// == Key Pattern ==
/// A compiled Redis-style key pattern.
#[derive(Clone)]
pub struct KeyPattern {
    source: String,
    glob: glob::Pattern,
}

impl KeyPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = glob::Pattern::new(&translate(pattern))
            .map_err(|e| CacheError::InvalidPattern(format!("{}: {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            glob,
        })
    }

    pub fn matches(&self, key: &str) -> bool {
        self.glob.matches(key)
    }
}

impl fmt::Debug for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyPattern").field(&self.source).finish()
    }
}

// == Translation ==
fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                while chars.get(i + 1) == Some(&'*') {
                    i += 1;
                }
                out.push('*');
                i += 1;
            }
            '?' => {
                out.push('?');
                i += 1;
            }
            '[' => i = translate_class(&chars, i + 1, &mut out),
            '\\' if i + 1 < chars.len() => {
                push_literal(&mut out, chars[i + 1]);
                i += 2;
            }
            c => {
                push_literal(&mut out, c);
                i += 1;
            }
        }
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    match c {
        '*' | '?' | '[' | ']' => {
            out.push('[');
            out.push(c);
            out.push(']');
        }
        _ => out.push(c),
    }
}

/// Reads a class starting just after its `[` and returns the index past it.
fn translate_class(chars: &[char], mut i: usize, out: &mut String) -> usize {
    let negated = chars.get(i) == Some(&'^');
    if negated {
        i += 1;
    }

    let mut ranges = Vec::new();
    loop {
        match chars.get(i).copied() {
            None => break,
            Some(']') => {
                i += 1;
                break;
            }
            Some('\\') if i + 1 < chars.len() => {
                ranges.push((chars[i + 1], chars[i + 1]));
                i += 2;
            }
            Some(start) if i + 2 < chars.len() && chars[i + 1] == '-' => {
                let end = chars[i + 2];
                ranges.push((start.min(end), start.max(end)));
                i += 3;
            }
            Some(c) => {
                ranges.push((c, c));
                i += 1;
            }
        }
    }

    push_class(out, negated, &ranges);
    i
}

/// Emits a glob class for `ranges`.
///
/// In a glob class `]` only works first, `!` must not be first, and a lone
/// `-` must be last. Those three are pulled out of the ranges and placed
/// where they parse as literals.
fn push_class(out: &mut String, negated: bool, ranges: &[(char, char)]) {
    let mut specials = [false; 3];
    let mut plain = Vec::new();
    for &(start, end) in ranges {
        split_specials(start, end, &mut specials, &mut plain);
    }
    let [bang, dash, bracket] = specials;

    if !bang && !dash && !bracket && plain.is_empty() {
        // Empty class: `[]` matches nothing, `[^]` matches any char.
        if negated {
            out.push('?');
        } else {
            out.push_str(&format!("[!{}-{}]", ALL_CHARS.0, ALL_CHARS.1));
        }
        return;
    }
    if !negated && bang && !dash && !bracket && plain.is_empty() {
        out.push('!');
        return;
    }

    out.push('[');
    if negated {
        out.push('!');
    }
    if bracket {
        out.push(']');
    }
    if !negated && !bracket && plain.is_empty() {
        // Only `!` and `-` left: lead with the dash.
        out.push('-');
        if bang {
            out.push('!');
        }
        out.push(']');
        return;
    }
    for (start, end) in plain {
        out.push(start);
        if start != end {
            out.push('-');
            out.push(end);
        }
    }
    if bang {
        out.push('!');
    }
    if dash {
        out.push('-');
    }
    out.push(']');
}

/// Cuts `!`, `-` and `]` out of the range `start..=end`, flagging the ones
/// it contained and keeping the remaining pieces.
fn split_specials(
    start: char,
    end: char,
    specials: &mut [bool; 3],
    plain: &mut Vec<(char, char)>,
) {
    let mut from = Some(start);
    for (slot, special) in CLASS_SPECIALS.iter().enumerate() {
        let Some(lo) = from else { return };
        if *special < lo || *special > end {
            continue;
        }
        specials[slot] = true;
        if lo < *special {
            if let Some(before) = char::from_u32(*special as u32 - 1) {
                plain.push((lo, before));
            }
        }
        from = char::from_u32(*special as u32 + 1).filter(|next| *next <= end);
    }
    if let Some(lo) = from {
        plain.push((lo, end));
    }
}
