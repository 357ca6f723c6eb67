//! Text normalization applied to every extracted sample before matching.
//!
//! Coarse patterns are written against plain ASCII separators, so the
//! normalizer folds the many ways documents encode "a space", "a dash" or "a
//! digit" into their ASCII forms and removes invisible characters that would
//! split a number in two. The function is pure and total.

/// Normalize one raw text sample.
///
/// - `\r\n` and lone `\r` become `\n`
/// - control characters other than `\n` are dropped (tabs count as spaces)
/// - zero-width characters, soft hyphens and byte-order marks are removed
/// - Unicode spaces become `' '` and runs of horizontal whitespace collapse to one
/// - Unicode dashes and the minus sign become `'-'`
/// - fullwidth ASCII forms (`０`-`９`, `Ａ`-`Ｚ`, ...) become plain ASCII
///
/// ```rust
/// use prism_detect::normalize;
///
/// assert_eq!(normalize("4111\u{00A0}1111\u{200B}1111\r\n"), "4111 11111111\n");
/// assert_eq!(normalize("１２３\u{2013}４５"), "123-45");
/// ```
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut pending_space = false;

    while let Some(ch) = chars.next() {
        let mapped = match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                Some('\n')
            }
            '\n' => Some('\n'),
            c if is_horizontal_space(c) => {
                pending_space = true;
                None
            }
            c if is_invisible(c) || c.is_control() => None,
            c if is_dash(c) => Some('-'),
            c => Some(fold_fullwidth(c)),
        };

        if let Some(c) = mapped {
            if pending_space {
                if c != '\n' {
                    out.push(' ');
                }
                pending_space = false;
            }
            out.push(c);
        }
    }

    if pending_space {
        out.push(' ');
    }
    out
}

fn is_horizontal_space(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t'
            | '\u{000B}'
            | '\u{000C}'
            | '\u{00A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

fn is_invisible(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}' | '\u{180E}' | '\u{200B}'..='\u{200D}' | '\u{2060}' | '\u{FEFF}'
    )
}

fn is_dash(c: char) -> bool {
    matches!(c, '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{FE58}' | '\u{FE63}' | '\u{FF0D}')
}

fn fold_fullwidth(c: char) -> char {
    if ('\u{FF01}'..='\u{FF5E}').contains(&c) {
        char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endings_unified() {
        assert_eq!(normalize("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn test_control_characters_stripped() {
        assert_eq!(normalize("ab\u{0000}c\u{0007}d\u{001B}"), "abcd");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(normalize("a \t\u{00A0}\u{2009} b"), "a b");
        assert_eq!(normalize("line   \nnext"), "line\nnext");
        assert_eq!(normalize("trailing\t"), "trailing ");
    }

    #[test]
    fn test_invisible_separators_removed() {
        assert_eq!(normalize("7707\u{200B}083\u{00AD}893"), "7707083893");
        assert_eq!(normalize("\u{FEFF}header"), "header");
    }

    #[test]
    fn test_dashes_unified() {
        assert_eq!(normalize("123\u{2012}45\u{2014}6789\u{2212}1"), "123-45-6789-1");
    }

    #[test]
    fn test_fullwidth_folded() {
        assert_eq!(normalize("ＩＢＡＮ：ＧＢ８２"), "IBAN:GB82");
    }

    #[test]
    fn test_idempotent() {
        let raw = "card\u{00A0}4111\u{2009}1111 \r\n\u{FF14}111\t\t1111";
        let once = normalize(raw);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_non_latin_text_preserved() {
        assert_eq!(normalize("Паспорт №  45 08"), "Паспорт № 45 08");
    }
}
