//! Lead CSV ingestion: from an uploaded byte buffer to a per-row import report.
//!
//! Stages, each usable on its own:
//! - [`encoding::detect`] classifies the bytes, [`codec`] transcodes them to UTF-8.
//! - [`normalize::normalize`] canonicalizes quotes, dashes, spaces and line endings.
//! - [`delimiter::detect`] picks `,` `;` tab or `|` from the first lines.
//! - [`tokenizer`] splits lines into header and rows, quote-aware.
//! - [`mapping::FieldMapping`] assigns columns to [`fields::LEAD_FIELDS`].
//! - [`validate::validate`] checks rows and finds in-file and remote duplicate emails.
//! - [`import::Importer`] creates valid rows one at a time, reporting progress.
//!
//! [`ImportSession`] chains them for one upload.
#![cfg_attr(docsrs, feature(doc_cfg))]
//
pub mod codec;
pub mod coerce;
pub mod delimiter;
pub mod encoding;
pub mod fields;
pub mod import;
mod io;
pub mod logging;
pub mod mapping;
pub mod normalize;
pub mod payload;
pub mod remote;
mod session;
pub mod template;
pub mod tokenizer;
pub mod validate;

pub use crate::delimiter::Delimiter;
pub use crate::encoding::{Encoding, RawDocument};
pub use crate::fields::{FieldKey, LEAD_FIELDS};
pub use crate::import::{ImportOptions, ImportOutcome, ImportProgress, ImportStatus, ImportSummary, Importer};
pub use crate::io::{build_upload_reader, read_upload, upload_from_path, UploadMeta};
pub use crate::mapping::FieldMapping;
pub use crate::payload::LeadPayload;
pub use crate::remote::{DirectoryClient, DirectoryConfig, DuplicateChecker, NoRemoteCheck, RecordCreator};
pub use crate::session::ImportSession;
pub use crate::tokenizer::{HeaderRow, RawRow};
pub use crate::validate::{ValidationError, ValidationSummary};

use thiserror::Error;

/// Errors that stop an ingestion session. Row-level problems are reported as
/// [`ValidationError`]s instead.
#[derive(Debug, Error)]
pub enum LeadImportError {
    #[error("O arquivo está vazio ou não possui cabeçalho")]
    EmptyDocument,
    #[error("O arquivo não possui linhas de dados")]
    NoDataRows,
    #[error("Campo obrigatório sem coluna mapeada: {0}")]
    MissingRequiredField(FieldKey),
    #[error("Coluna inexistente: {0}")]
    UnknownColumn(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
}

pub type ImportResult<T> = std::result::Result<T, LeadImportError>;
