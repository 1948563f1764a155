use bytes::Bytes;
use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::info;

use crate::codec::decode_document;
use crate::delimiter::{self, Delimiter};
use crate::encoding::{Encoding, RawDocument};
use crate::fields::{FieldKey, LEAD_FIELDS};
use crate::import::{ImportOptions, ImportProgress, ImportStatus, ImportSummary, Importer};
use crate::mapping::FieldMapping;
use crate::remote::{DuplicateChecker, RecordCreator};
use crate::tokenizer::{parse_table, HeaderRow, RawRow, Table};
use crate::validate::{self, DuplicateCache, ValidationSummary};
use crate::ImportResult;

/// One upload, from raw bytes to import report.
///
/// The raw bytes and decoded text are dropped once the document is
/// tokenized; the session keeps only the header, the rows and its own
/// duplicate-check cache.
#[derive(Debug)]
pub struct ImportSession {
    encoding: Encoding,
    delimiter: Delimiter,
    header: HeaderRow,
    rows: Vec<RawRow>,
    mapping: FieldMapping,
    cache: DuplicateCache,
    validation: Option<ValidationSummary>,
}

impl ImportSession {
    pub fn from_bytes(bytes: impl Into<Bytes>) -> ImportResult<Self> {
        Self::from_document(RawDocument::new(bytes))
    }

    pub fn from_document(doc: RawDocument) -> ImportResult<Self> {
        let encoding = doc.encoding();
        let text = decode_document(&doc);
        drop(doc);

        let delimiter = delimiter::detect(text.as_str());
        let Table { header, rows } = parse_table(text.as_str(), delimiter)?;
        let mapping = FieldMapping::auto_map(&header, LEAD_FIELDS);

        info!(
            %encoding,
            %delimiter,
            columns = header.len(),
            rows = rows.len(),
            "document parsed"
        );

        Ok(Self {
            encoding,
            delimiter,
            header,
            rows,
            mapping,
            cache: DuplicateCache::new(),
            validation: None,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    pub fn header(&self) -> &HeaderRow {
        &self.header
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Latest validation pass, if still current for the mapping and not
    /// superseded by an import.
    pub fn validation(&self) -> Option<&ValidationSummary> {
        self.validation.as_ref()
    }

    /// Remap a column. Any previous validation pass is discarded.
    pub fn set_mapping(&mut self, column: &str, field: Option<FieldKey>) -> ImportResult<()> {
        self.mapping.set(column, field)?;
        self.validation = None;
        Ok(())
    }

    pub async fn validate(&mut self, checker: &dyn DuplicateChecker) -> &ValidationSummary {
        let summary = validate::validate(&self.rows, &self.mapping, checker, &mut self.cache).await;
        self.validation.insert(summary)
    }

    /// Import every valid row, validating first when no current pass exists.
    ///
    /// The returned report lists validation errors first, then creation
    /// failures. Emails created here count as on record for the rest of the
    /// session; the validation pass is discarded.
    pub async fn import<F>(
        &mut self,
        checker: &dyn DuplicateChecker,
        creator: &dyn RecordCreator,
        options: ImportOptions,
        on_progress: F,
    ) -> ImportSummary
    where
        F: FnMut(ImportProgress) -> ControlFlow<()>,
    {
        let validation = match self.validation.take() {
            Some(v) => v,
            None => validate::validate(&self.rows, &self.mapping, checker, &mut self.cache).await,
        };

        let valid = validation.valid_rows(&self.rows);
        let mut summary = ImportSummary::from_validation(&validation);
        Importer::new(options)
            .run_into(&mut summary, &valid, &self.mapping, creator, on_progress)
            .await;

        self.remember_imported(&summary);
        summary
    }

    fn remember_imported(&mut self, summary: &ImportSummary) {
        let Some(idx) = self.mapping.column_of(FieldKey::Email) else {
            return;
        };
        let imported: HashSet<usize> = summary
            .outcomes
            .iter()
            .filter(|o| o.status == ImportStatus::Imported)
            .map(|o| o.row)
            .collect();
        for row in self.rows.iter().filter(|r| imported.contains(&r.line)) {
            let email = row.cell(idx).trim();
            if !email.is_empty() {
                self.cache.mark_on_record(email);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::NoRemoteCheck;
    use crate::LeadImportError;

    #[test]
    fn parses_semicolon_latin1_upload() {
        let bytes = b"Nome;E-mail;Cidade\r\nJo\xE3o;joao@x.com;S\xE3o Paulo\r\n".to_vec();
        let session = ImportSession::from_bytes(bytes).unwrap();
        assert_eq!(session.encoding(), Encoding::Latin1);
        assert_eq!(session.delimiter(), Delimiter::Semicolon);
        assert_eq!(session.rows()[0].cells, ["João", "joao@x.com", "São Paulo"]);
        assert_eq!(session.mapping().column_of(FieldKey::City), Some(2));
        // "E-mail" does not contain "email"
        assert!(!session.mapping().is_mapped(FieldKey::Email));
    }

    #[test]
    fn structural_errors_abort() {
        assert!(matches!(
            ImportSession::from_bytes(Vec::new()),
            Err(LeadImportError::EmptyDocument)
        ));
        assert!(matches!(
            ImportSession::from_bytes(b"Nome,Email\n".to_vec()),
            Err(LeadImportError::NoDataRows)
        ));
    }

    #[tokio::test]
    async fn remapping_discards_validation() {
        let bytes = b"Nome;E-mail\nAna;ana@x.com\n".to_vec();
        let mut session = ImportSession::from_bytes(bytes).unwrap();

        let first = session.validate(&NoRemoteCheck).await;
        assert_eq!(first.invalid_count, 1);

        session.set_mapping("E-mail", Some(FieldKey::Email)).unwrap();
        assert!(session.validation().is_none());

        let second = session.validate(&NoRemoteCheck).await;
        assert_eq!(second.valid_count, 1);
    }
}
