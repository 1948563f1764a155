use chrono::NaiveDate;
use serde::Serialize;

use crate::coerce::{digits_only, match_choice, parse_date, parse_money};
use crate::fields::{FieldKey, STAGES, TEMPERATURES};
use crate::mapping::FieldMapping;
use crate::tokenizer::RawRow;

pub const DEFAULT_STAGE: &str = "novo";
pub const DEFAULT_TEMPERATURE: &str = "frio";
pub const DEFAULT_SOURCE: &str = "Importação CSV";

/// Creation request for one lead, built from a validated row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadPayload {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    pub stage: String,
    pub temperature: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_contact: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl LeadPayload {
    /// Convert a row using only mapped, non-empty cells. Unparsable typed
    /// cells are left out; validation has already rejected those rows.
    pub fn from_row(row: &RawRow, mapping: &FieldMapping, default_source: &str) -> Self {
        let text = |key: FieldKey| -> Option<String> {
            mapping
                .column_of(key)
                .map(|idx| row.cell(idx).trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let digits = |key: FieldKey| text(key).map(|v| digits_only(&v)).filter(|v| !v.is_empty());

        Self {
            name: text(FieldKey::Name).unwrap_or_default(),
            email: text(FieldKey::Email),
            phone: digits(FieldKey::Phone),
            company: text(FieldKey::Company),
            position: text(FieldKey::Position),
            value: text(FieldKey::Value).and_then(|v| parse_money(&v)),
            stage: text(FieldKey::Stage)
                .and_then(|v| match_choice(&v, STAGES))
                .unwrap_or(DEFAULT_STAGE)
                .to_string(),
            temperature: text(FieldKey::Temperature)
                .and_then(|v| match_choice(&v, TEMPERATURES))
                .unwrap_or(DEFAULT_TEMPERATURE)
                .to_string(),
            source: text(FieldKey::Source).unwrap_or_else(|| default_source.to_string()),
            next_contact: text(FieldKey::NextContact).and_then(|v| parse_date(&v)),
            cep: digits(FieldKey::Cep),
            address: text(FieldKey::Address),
            city: text(FieldKey::City),
            state: text(FieldKey::State),
            notes: text(FieldKey::Notes),
        }
    }
}
