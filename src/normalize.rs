/// Canonicalize punctuation variants and line endings.
///
/// Curly quotes become straight quotes, em/en dashes become `-`, non-breaking
/// spaces become plain spaces, and `\r\n` / `\r` become `\n`. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => out.push('"'),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => out.push('\''),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{00A0}' => out.push(' '),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push('\n');
            }
            c => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_punctuation_variants() {
        assert_eq!(
            normalize("\u{201C}Olá\u{201D} \u{2018}x\u{2019} a\u{2013}b\u{2014}c\u{00A0}d"),
            "\"Olá\" 'x' a-b-c d"
        );
    }

    #[test]
    fn collapses_line_endings() {
        assert_eq!(normalize("a\r\nb\rc\n\r\nd"), "a\nb\nc\n\nd");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "Nome;Email\r\nAna;ana@x.com\r",
            "\u{201C}quoted\u{201D}\u{00A0}\u{2014}",
            "already plain\n",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }
}
