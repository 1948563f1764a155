use memchr::memchr_iter;
use serde::Serialize;
use std::fmt;

/// Number of leading lines sampled when sniffing the delimiter.
pub const SAMPLE_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
    Tab,
    Pipe,
}

impl Delimiter {
    /// Candidates in tie-break order; the first entry is the fallback.
    pub const ALL: [Delimiter; 4] = [
        Delimiter::Comma,
        Delimiter::Semicolon,
        Delimiter::Tab,
        Delimiter::Pipe,
    ];

    pub fn as_char(self) -> char {
        self.as_byte() as char
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
            Delimiter::Pipe => b'|',
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
            Delimiter::Tab => "tab",
            Delimiter::Pipe => "pipe",
        };
        f.write_str(name)
    }
}

/// Pick the separator occurring most often in the first [`SAMPLE_LINES`]
/// non-blank lines. A tie for the top count, or no candidate at all, yields
/// comma.
pub fn detect(text: &str) -> Delimiter {
    let sample: Vec<&[u8]> = text
        .split('\n')
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_LINES)
        .map(str::as_bytes)
        .collect();

    let counts = Delimiter::ALL.map(|d| {
        let n: usize = sample
            .iter()
            .map(|line| memchr_iter(d.as_byte(), line).count())
            .sum();
        (d, n)
    });

    let best = counts.iter().map(|&(_, n)| n).max().unwrap_or(0);
    let mut leaders = counts.iter().filter(|&&(_, n)| n == best);
    match (leaders.next(), leaders.next()) {
        (Some(&(d, n)), None) if n > 0 => d,
        _ => Delimiter::Comma,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_most_frequent() {
        assert_eq!(detect("a;b;c\n1;2;3\n"), Delimiter::Semicolon);
        assert_eq!(detect("a\tb\tc\n1\t2,5\t3\n"), Delimiter::Tab);
        assert_eq!(detect("a|b|c\n"), Delimiter::Pipe);
        assert_eq!(detect("a,b\n1,2\n"), Delimiter::Comma);
    }

    #[test]
    fn semicolon_with_decimal_commas() {
        let text = "Nome;Valor;Cidade\nAna;1.234,56;Recife\nBea;99,90;Natal\n";
        assert_eq!(detect(text), Delimiter::Semicolon);
    }

    #[test]
    fn ties_and_empty_fall_back_to_comma() {
        assert_eq!(detect("a;b|c\n"), Delimiter::Comma);
        assert_eq!(detect("single column\nvalue\n"), Delimiter::Comma);
        assert_eq!(detect(""), Delimiter::Comma);
    }

    #[test]
    fn only_first_lines_are_sampled() {
        let mut text = String::from("a;b\n");
        for _ in 0..10 {
            text.push_str("x,y,z,w\n");
        }
        // 1 semicolon vs 4 lines * 3 commas in the sample
        assert_eq!(detect(&text), Delimiter::Comma);

        let mut text = String::from("a;b;c\n1;2;3\n4;5;6\n7;8;9\n0;1;2\n");
        text.push_str(&",".repeat(100));
        assert_eq!(detect(&text), Delimiter::Semicolon);
    }

    #[test]
    fn leading_blank_lines_are_not_sampled() {
        let text = "\n\n  \n\n\nNome;Email\nAna;ana@x.com\n";
        assert_eq!(detect(text), Delimiter::Semicolon);
    }
}
