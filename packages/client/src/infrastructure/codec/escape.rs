//! ClientQuery value escaping.
//!
//! Values on the wire may not contain spaces, pipes or control characters,
//! so each of them travels as a two-character backslash sequence.

/// Raw character and the letter that follows the backslash on the wire.
///
/// Backslash comes first so the sequences introduced for the other
/// characters are never escaped a second time.
const ESCAPES: [(char, char); 11] = [
    ('\\', '\\'),
    (' ', 's'),
    ('/', '/'),
    ('|', 'p'),
    ('\u{08}', 'b'),
    ('\u{0C}', 'f'),
    ('\n', 'n'),
    ('\r', 'r'),
    ('\t', 't'),
    ('\u{07}', 'a'),
    ('\u{0B}', 'v'),
];

/// Escape a raw value for transmission.
pub fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match ESCAPES.iter().find(|(plain, _)| *plain == c) {
            Some((_, code)) => {
                escaped.push('\\');
                escaped.push(*code);
            }
            None => escaped.push(c),
        }
    }
    escaped
}

/// Reverse [`escape`].
///
/// Works in a single left-to-right pass: a decoded backslash is emitted
/// directly and never looked at again, so `\\s` yields `\s` rather than
/// a backslash followed by a space. Unknown sequences are kept verbatim.
pub fn unescape(escaped: &str) -> String {
    let mut raw = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            raw.push(c);
            continue;
        }
        match chars.next() {
            Some(code) => match ESCAPES.iter().find(|(_, known)| *known == code) {
                Some((plain, _)) => raw.push(*plain),
                None => {
                    raw.push('\\');
                    raw.push(code);
                }
            },
            None => raw.push('\\'),
        }
    }
    raw
}
