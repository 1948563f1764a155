use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::coerce::{digits_only, is_valid_email, match_choice, parse_date, parse_money};
use crate::fields::{FieldKey, FieldKind, LEAD_FIELDS};
use crate::mapping::FieldMapping;
use crate::remote::DuplicateChecker;
use crate::tokenizer::RawRow;

pub const MSG_REQUIRED_UNMAPPED: &str = "Campo obrigatório não mapeado";
pub const MSG_REQUIRED_EMPTY: &str = "Campo obrigatório não preenchido";
pub const MSG_EMAIL_INVALID: &str = "Email inválido";
pub const MSG_EMAIL_DUPLICATE_FILE: &str = "Email duplicado no arquivo";
pub const MSG_EMAIL_DUPLICATE_REMOTE: &str = "Email já existe na base de dados";
pub const MSG_PHONE_LENGTH: &str = "Telefone deve ter 10 ou 11 dígitos";
pub const MSG_VALUE_INVALID: &str = "Valor inválido";
pub const MSG_VALUE_NEGATIVE: &str = "Valor não pode ser negativo";
pub const MSG_DATE_INVALID: &str = "Data inválida";

/// One broken rule on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub row: usize,
    pub field: String,
    pub message: String,
    pub value: String,
}

impl ValidationError {
    pub fn new(row: usize, field: impl Into<String>, message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            row,
            field: field.into(),
            message: message.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub duplicate_count: usize,
    pub errors: Vec<ValidationError>,
    /// Advisory notes that did not invalidate any row.
    pub warnings: Vec<String>,
}

impl ValidationSummary {
    /// Rows with no recorded error, in their original order.
    pub fn valid_rows<'a>(&self, rows: &'a [RawRow]) -> Vec<&'a RawRow> {
        let failed: HashSet<usize> = self.errors.iter().map(|e| e.row).collect();
        rows.iter().filter(|r| !failed.contains(&r.line)).collect()
    }
}

/// Remote duplicate answers already obtained during one session.
#[derive(Debug, Default)]
pub struct DuplicateCache {
    known: HashMap<String, bool>,
}

impl DuplicateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    fn is_known(&self, email: &str) -> bool {
        self.known.contains_key(email)
    }

    fn record(&mut self, queried: &[String], existing: &[String]) {
        let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();
        for email in queried {
            self.known.insert(email.clone(), existing.contains(email.as_str()));
        }
    }

    /// Record an email as on record, e.g. after this session created it.
    pub fn mark_on_record(&mut self, email: &str) {
        self.known.insert(email.to_string(), true);
    }

    fn existing(&self) -> HashSet<String> {
        self.known
            .iter()
            .filter(|(_, on_record)| **on_record)
            .map(|(email, _)| email.clone())
            .collect()
    }
}

/// Validate every row, asking `checker` once about emails not yet in `cache`.
///
/// A failing checker does not fail validation: remote duplicates are then only
/// detected for emails the cache already knows, and a warning is added.
pub async fn validate(
    rows: &[RawRow],
    mapping: &FieldMapping,
    checker: &dyn DuplicateChecker,
    cache: &mut DuplicateCache,
) -> ValidationSummary {
    let candidates = remote_candidates(rows, mapping);
    let unknown: Vec<String> = candidates
        .into_iter()
        .filter(|email| !cache.is_known(email))
        .collect();

    let mut warning = None;
    if !unknown.is_empty() {
        match checker.check_duplicates(&unknown).await {
            Ok(existing) => {
                debug!(queried = unknown.len(), existing = existing.len(), "remote duplicate check");
                cache.record(&unknown, &existing);
            }
            Err(err) => {
                warn!(error = %err, "remote duplicate check failed, continuing without it");
                warning = Some(format!(
                    "Não foi possível verificar duplicatas na base de dados: {err}"
                ));
            }
        }
    }

    let mut summary = validate_rows(rows, mapping, &cache.existing());
    summary.warnings.extend(warning);
    info!(
        total = summary.total,
        valid = summary.valid_count,
        invalid = summary.invalid_count,
        duplicates = summary.duplicate_count,
        "validation finished"
    );
    summary
}

/// Distinct, well-formed, non-empty emails in first-seen order.
fn remote_candidates(rows: &[RawRow], mapping: &FieldMapping) -> Vec<String> {
    let Some(idx) = mapping.column_of(FieldKey::Email) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    rows.iter()
        .map(|r| r.cell(idx).trim())
        .filter(|e| !e.is_empty() && is_valid_email(e))
        .filter(|e| seen.insert(e.to_string()))
        .map(str::to_string)
        .collect()
}

/// Apply the per-row rules given the set of emails known to be on record.
pub fn validate_rows(
    rows: &[RawRow],
    mapping: &FieldMapping,
    on_record: &HashSet<String>,
) -> ValidationSummary {
    let mut summary = ValidationSummary {
        total: rows.len(),
        ..Default::default()
    };
    let mut seen_emails: HashSet<String> = HashSet::new();

    for row in rows {
        let before = summary.errors.len();
        let mut check = RowCheck {
            row,
            mapping,
            errors: &mut summary.errors,
        };

        check.required_fields();
        if check.email(&mut seen_emails, on_record) {
            summary.duplicate_count += 1;
        }
        check.phone();
        check.value();
        check.next_contact();
        check.choice(FieldKey::Stage);
        check.choice(FieldKey::Temperature);

        if summary.errors.len() == before {
            summary.valid_count += 1;
        }
    }

    summary.invalid_count = summary.total - summary.valid_count;
    summary
}

struct RowCheck<'a> {
    row: &'a RawRow,
    mapping: &'a FieldMapping,
    errors: &'a mut Vec<ValidationError>,
}

impl RowCheck<'_> {
    /// Mapped, non-blank cell for `key`.
    fn cell(&self, key: FieldKey) -> Option<&str> {
        self.mapping
            .column_of(key)
            .map(|idx| self.row.cell(idx).trim())
            .filter(|v| !v.is_empty())
    }

    fn fail(&mut self, key: FieldKey, message: impl Into<String>, value: &str) {
        self.errors.push(ValidationError::new(
            self.row.line,
            key.definition().label,
            message,
            value,
        ));
    }

    fn required_fields(&mut self) {
        for field in LEAD_FIELDS.iter().filter(|f| f.required) {
            match self.mapping.column_of(field.key) {
                None => self.fail(field.key, MSG_REQUIRED_UNMAPPED, ""),
                Some(idx) => {
                    let raw = self.row.cell(idx);
                    if raw.trim().is_empty() {
                        self.fail(field.key, MSG_REQUIRED_EMPTY, raw);
                    }
                }
            }
        }
    }

    /// Returns true when the email was flagged as a duplicate.
    fn email(&mut self, seen: &mut HashSet<String>, on_record: &HashSet<String>) -> bool {
        let Some(email) = self.cell(FieldKey::Email).map(str::to_string) else {
            return false;
        };
        if !is_valid_email(&email) {
            self.fail(FieldKey::Email, MSG_EMAIL_INVALID, &email);
            return false;
        }
        if !seen.insert(email.clone()) {
            self.fail(FieldKey::Email, MSG_EMAIL_DUPLICATE_FILE, &email);
            return true;
        }
        if on_record.contains(&email) {
            self.fail(FieldKey::Email, MSG_EMAIL_DUPLICATE_REMOTE, &email);
            return true;
        }
        false
    }

    fn phone(&mut self) {
        let Some(raw) = self.cell(FieldKey::Phone).map(str::to_string) else {
            return;
        };
        let digits = digits_only(&raw).len();
        if digits != 10 && digits != 11 {
            self.fail(FieldKey::Phone, MSG_PHONE_LENGTH, &raw);
        }
    }

    fn value(&mut self) {
        let Some(raw) = self.cell(FieldKey::Value).map(str::to_string) else {
            return;
        };
        match parse_money(&raw) {
            None => self.fail(FieldKey::Value, MSG_VALUE_INVALID, &raw),
            Some(v) if v < 0.0 => self.fail(FieldKey::Value, MSG_VALUE_NEGATIVE, &raw),
            Some(_) => {}
        }
    }

    fn next_contact(&mut self) {
        let Some(raw) = self.cell(FieldKey::NextContact).map(str::to_string) else {
            return;
        };
        if parse_date(&raw).is_none() {
            self.fail(FieldKey::NextContact, MSG_DATE_INVALID, &raw);
        }
    }

    fn choice(&mut self, key: FieldKey) {
        let field = key.definition();
        let FieldKind::Choice(domain) = field.kind else {
            return;
        };
        let Some(raw) = self.cell(key).map(str::to_string) else {
            return;
        };
        if match_choice(&raw, domain).is_none() {
            let message = format!("{} inválida. Use: {}", field.label, domain.join(", "));
            self.fail(key, message, &raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::HeaderRow;

    fn mapped(cols: &[&str]) -> FieldMapping {
        let header = HeaderRow::from_cells(cols.iter().map(|c| c.to_string()).collect()).unwrap();
        FieldMapping::auto_map(&header, LEAD_FIELDS)
    }

    fn rows(data: &[&[&str]]) -> Vec<RawRow> {
        data.iter()
            .enumerate()
            .map(|(i, cells)| RawRow {
                line: i + 2,
                cells: cells.iter().map(|c| c.to_string()).collect(),
            })
            .collect()
    }

    #[test]
    fn in_file_duplicate_reported_on_second_row() {
        let mapping = mapped(&["Nome", "Email"]);
        let data = rows(&[&["Ana", "ana@x.com"], &["Bea", "ana@x.com"]]);
        let summary = validate_rows(&data, &mapping, &HashSet::new());

        assert_eq!(summary.duplicate_count, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].row, 3);
        assert_eq!(summary.errors[0].message, MSG_EMAIL_DUPLICATE_FILE);
        assert_eq!(summary.valid_count, 1);
        assert_eq!(summary.invalid_count, 1);
    }

    #[test]
    fn required_fields_unmapped_and_blank() {
        let mapping = mapped(&["Nome", "Telefone"]);
        let data = rows(&[&["", "11988887777"]]);
        let summary = validate_rows(&data, &mapping, &HashSet::new());

        let messages: Vec<(&str, &str)> = summary
            .errors
            .iter()
            .map(|e| (e.field.as_str(), e.message.as_str()))
            .collect();
        assert_eq!(
            messages,
            [("Nome", MSG_REQUIRED_EMPTY), ("Email", MSG_REQUIRED_UNMAPPED)]
        );
        assert_eq!(summary.valid_count, 0);
    }

    #[test]
    fn typed_fields_in_fixed_order() {
        let mapping = mapped(&["Nome", "Email", "Telefone", "Valor", "Próximo Contato", "Etapa", "Temperatura"]);
        let data = rows(&[&["Ana", "ana@", "123", "-5", "32/13/2024", "ganho", "gelado"]]);
        let summary = validate_rows(&data, &mapping, &HashSet::new());

        let messages: Vec<&str> = summary.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0], MSG_EMAIL_INVALID);
        assert_eq!(messages[1], MSG_PHONE_LENGTH);
        assert_eq!(messages[2], MSG_VALUE_NEGATIVE);
        assert_eq!(messages[3], MSG_DATE_INVALID);
        assert!(messages[4].starts_with("Etapa inválida"));
        assert!(messages[5].starts_with("Temperatura inválida"));
        assert_eq!(summary.errors[2].value, "-5");
    }

    #[test]
    fn accepts_well_formed_row() {
        let mapping = mapped(&["Nome", "Email", "Telefone", "Valor", "Etapa", "Temperatura"]);
        let data = rows(&[&["Ana", "ana@x.com", "(11) 3333-4444", "1.234,56", "Reuniao", "QUENTE"]]);
        let summary = validate_rows(&data, &mapping, &HashSet::new());
        assert!(summary.errors.is_empty(), "{:?}", summary.errors);
        assert_eq!(summary.valid_rows(&data).len(), 1);
    }

    #[test]
    fn remote_duplicates_counted() {
        let mapping = mapped(&["Nome", "Email"]);
        let data = rows(&[&["Ana", "ana@x.com"], &["Bea", "bea@x.com"], &["Ana 2", "ana@x.com"]]);
        let on_record: HashSet<String> = ["ana@x.com".to_string()].into_iter().collect();
        let summary = validate_rows(&data, &mapping, &on_record);

        let found: Vec<(usize, &str)> = summary
            .errors
            .iter()
            .map(|e| (e.row, e.message.as_str()))
            .collect();
        assert_eq!(
            found,
            [(2, MSG_EMAIL_DUPLICATE_REMOTE), (4, MSG_EMAIL_DUPLICATE_FILE)]
        );
        assert_eq!(summary.duplicate_count, 2);
    }

    #[test]
    fn email_comparison_is_case_sensitive() {
        let mapping = mapped(&["Nome", "Email"]);
        let data = rows(&[&["Ana", "ana@x.com"], &["Ana", "ANA@x.com"]]);
        let summary = validate_rows(&data, &mapping, &HashSet::new());
        assert_eq!(summary.duplicate_count, 0);
    }

    #[test]
    fn candidates_are_distinct_and_well_formed() {
        let mapping = mapped(&["Nome", "Email"]);
        let data = rows(&[&["a", "ana@x.com"], &["b", "nope"], &["c", "ana@x.com"], &["d", ""], &["e", "bea@x.com"]]);
        assert_eq!(remote_candidates(&data, &mapping), ["ana@x.com", "bea@x.com"]);
    }
}
