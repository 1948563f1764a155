use serde::Serialize;
use tracing::debug;

use crate::delimiter::Delimiter;
use crate::normalize::normalize;
use crate::{ImportResult, LeadImportError};

/// Ordered source column names. Never empty, no blank names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderRow {
    columns: Vec<String>,
}

impl HeaderRow {
    /// Builds a header from tokenized cells. Blank cells are named after
    /// their position (`Coluna 3`) and repeated names get an occurrence
    /// suffix (`Email (2)`), so every column is addressable by name. A header
    /// with no named cell at all is treated as an empty document.
    pub fn from_cells(cells: Vec<String>) -> ImportResult<Self> {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return Err(LeadImportError::EmptyDocument);
        }
        let mut columns: Vec<String> = Vec::with_capacity(cells.len());
        for (i, cell) in cells.into_iter().enumerate() {
            let base = if cell.trim().is_empty() {
                format!("Coluna {}", i + 1)
            } else {
                cell
            };
            let mut name = base.clone();
            let mut occurrence = 1;
            while columns.contains(&name) {
                occurrence += 1;
                name = format!("{base} ({occurrence})");
            }
            columns.push(name);
        }
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.columns.get(idx).map(String::as_str)
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

/// One data line, cells aligned to the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRow {
    /// 1-based line number; the header is line 1.
    pub line: usize,
    pub cells: Vec<String>,
}

impl RawRow {
    pub fn cell(&self, idx: usize) -> &str {
        self.cells.get(idx).map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub header: HeaderRow,
    pub rows: Vec<RawRow>,
}

/// Split one line into cells.
///
/// A `"` or `'` at the start of a cell opens a quoted section closed by the
/// same character; inside it the delimiter is literal and a doubled quote
/// stands for one quote. Quote characters anywhere else are literal. Cells
/// are normalized and trimmed.
pub fn tokenize(line: &str, delimiter: Delimiter) -> Vec<String> {
    let delim = delimiter.as_char();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '"';
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == quote_char {
                if chars.peek() == Some(&quote_char) {
                    current.push(c);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else if c == delim {
            fields.push(finish_cell(&current));
            current.clear();
        } else if (c == '"' || c == '\'') && current.trim().is_empty() {
            current.clear();
            in_quotes = true;
            quote_char = c;
        } else {
            current.push(c);
        }
    }
    fields.push(finish_cell(&current));

    fields
}

fn finish_cell(raw: &str) -> String {
    normalize(raw).trim().to_string()
}

/// Split decoded text into a header and data rows.
///
/// Blank lines are skipped before numbering. Rows shorter than the header are
/// padded with empty cells, longer rows are cut to the header width. Quoted
/// fields spanning several lines are not supported.
pub fn parse_table(text: &str, delimiter: Delimiter) -> ImportResult<Table> {
    let mut lines = text.split('\n').filter(|l| !l.trim().is_empty());

    let header_line = lines.next().ok_or(LeadImportError::EmptyDocument)?;
    let header = HeaderRow::from_cells(tokenize(header_line, delimiter))?;
    let width = header.len();

    let rows: Vec<RawRow> = lines
        .enumerate()
        .map(|(i, line)| {
            let mut cells = tokenize(line, delimiter);
            let line = i + 2;
            if cells.len() > width {
                debug!(line, extra = cells.len() - width, "dropping cells beyond header width");
            }
            cells.resize(width, String::new());
            RawRow { line, cells }
        })
        .collect();

    if rows.is_empty() {
        return Err(LeadImportError::NoDataRows);
    }

    debug!(columns = width, rows = rows.len(), %delimiter, "tokenized document");
    Ok(Table { header, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_fields() {
        let fields = ["Ana", "ana@x.com", "11988887777", "ACME"];
        for d in Delimiter::ALL {
            let line = fields.join(d.as_char().to_string().as_str());
            assert_eq!(tokenize(&line, d), fields);
        }
    }

    #[test]
    fn quoted_delimiter_is_literal() {
        assert_eq!(tokenize("\"a,b\",c", Delimiter::Comma), ["a,b", "c"]);
        assert_eq!(tokenize("'a;b';c", Delimiter::Semicolon), ["a;b", "c"]);
    }

    #[test]
    fn doubled_quotes_unescape() {
        assert_eq!(
            tokenize("\"she said \"\"hi\"\"\"", Delimiter::Comma),
            ["she said \"hi\""]
        );
    }

    #[test]
    fn apostrophe_inside_a_value_is_literal() {
        assert_eq!(
            tokenize("Maria D'Ávila,maria@x.com", Delimiter::Comma),
            ["Maria D'Ávila", "maria@x.com"]
        );
    }

    #[test]
    fn cells_are_trimmed_and_trailing_empty_kept() {
        assert_eq!(tokenize(" a , b ,", Delimiter::Comma), ["a", "b", ""]);
    }

    #[test]
    fn short_rows_are_padded() {
        let table = parse_table("Nome,Email,Telefone\nAna\n", Delimiter::Comma).unwrap();
        assert_eq!(table.rows[0].cells, ["Ana", "", ""]);
        assert_eq!(table.rows[0].line, 2);
    }

    #[test]
    fn long_rows_are_cut() {
        let table = parse_table("Nome,Email\nAna,a@x.com,extra\n", Delimiter::Comma).unwrap();
        assert_eq!(table.rows[0].cells, ["Ana", "a@x.com"]);
    }

    #[test]
    fn blank_lines_are_skipped_before_numbering() {
        let table = parse_table("\nNome\n\n  \nAna\nBea\n", Delimiter::Comma).unwrap();
        assert_eq!(table.header.get(0), Some("Nome"));
        let lines: Vec<usize> = table.rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, [2, 3]);
    }

    #[test]
    fn blank_header_cells_get_positional_names() {
        let table = parse_table("Nome,,Email\na,b,c\n", Delimiter::Comma).unwrap();
        let names: Vec<&str> = table.header.iter().collect();
        assert_eq!(names, ["Nome", "Coluna 2", "Email"]);
    }

    #[test]
    fn repeated_header_names_are_suffixed() {
        let table = parse_table("Email,Nome,Email,Email
a,b,c,d
", Delimiter::Comma).unwrap();
        let names: Vec<&str> = table.header.iter().collect();
        assert_eq!(names, ["Email", "Nome", "Email (2)", "Email (3)"]);
        assert_eq!(table.header.position("Email (2)"), Some(2));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            parse_table("", Delimiter::Comma),
            Err(LeadImportError::EmptyDocument)
        ));
        assert!(matches!(
            parse_table(" \n\n", Delimiter::Comma),
            Err(LeadImportError::EmptyDocument)
        ));
        assert!(matches!(
            parse_table(",,\nAna,b,c", Delimiter::Comma),
            Err(LeadImportError::EmptyDocument)
        ));
        assert!(matches!(
            parse_table("Nome,Email\n\n", Delimiter::Comma),
            Err(LeadImportError::NoDataRows)
        ));
    }
}
