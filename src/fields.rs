use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Marker appended to the label of required fields.
pub const REQUIRED_MARKER: &str = "*";

pub const STAGES: &[&str] = &["novo", "contatado", "reuniao", "proposta", "fechado", "perdido"];
pub const TEMPERATURES: &[&str] = &["frio", "morno", "quente"];

/// Canonical lead attributes a source column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKey {
    Name,
    Email,
    Phone,
    Company,
    Position,
    Value,
    Stage,
    Temperature,
    Source,
    NextContact,
    Cep,
    Address,
    City,
    State,
    Notes,
}

/// What the validator and payload builder do with a field's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    Money,
    Date,
    Digits,
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct CanonicalField {
    pub key: FieldKey,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

impl CanonicalField {
    const fn new(key: FieldKey, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            required: false,
            kind,
        }
    }

    const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    /// Label as shown to users, with the required marker when applicable.
    pub fn display_label(&self) -> String {
        if self.required {
            format!("{} {}", self.label, REQUIRED_MARKER)
        } else {
            self.label.to_string()
        }
    }
}

/// Catalogue order is also auto-mapping priority.
pub const LEAD_FIELDS: &[CanonicalField] = &[
    CanonicalField::new(FieldKey::Name, "Nome", FieldKind::Text).required(),
    CanonicalField::new(FieldKey::Email, "Email", FieldKind::Email).required(),
    CanonicalField::new(FieldKey::Phone, "Telefone", FieldKind::Phone),
    CanonicalField::new(FieldKey::Company, "Empresa", FieldKind::Text),
    CanonicalField::new(FieldKey::Position, "Cargo", FieldKind::Text),
    CanonicalField::new(FieldKey::Value, "Valor", FieldKind::Money),
    CanonicalField::new(FieldKey::Stage, "Etapa", FieldKind::Choice(STAGES)),
    CanonicalField::new(FieldKey::Temperature, "Temperatura", FieldKind::Choice(TEMPERATURES)),
    CanonicalField::new(FieldKey::Source, "Origem", FieldKind::Text),
    CanonicalField::new(FieldKey::NextContact, "Próximo Contato", FieldKind::Date),
    CanonicalField::new(FieldKey::Cep, "CEP", FieldKind::Digits),
    CanonicalField::new(FieldKey::Address, "Endereço", FieldKind::Text),
    CanonicalField::new(FieldKey::City, "Cidade", FieldKind::Text),
    CanonicalField::new(FieldKey::State, "Estado", FieldKind::Text),
    CanonicalField::new(FieldKey::Notes, "Observações", FieldKind::Text),
];

impl FieldKey {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Name => "name",
            FieldKey::Email => "email",
            FieldKey::Phone => "phone",
            FieldKey::Company => "company",
            FieldKey::Position => "position",
            FieldKey::Value => "value",
            FieldKey::Stage => "stage",
            FieldKey::Temperature => "temperature",
            FieldKey::Source => "source",
            FieldKey::NextContact => "next_contact",
            FieldKey::Cep => "cep",
            FieldKey::Address => "address",
            FieldKey::City => "city",
            FieldKey::State => "state",
            FieldKey::Notes => "notes",
        }
    }

    /// Catalogue entry for this key. Entries sit in [`LEAD_FIELDS`] in
    /// declaration order.
    pub fn definition(self) -> &'static CanonicalField {
        let idx = match self {
            FieldKey::Name => 0,
            FieldKey::Email => 1,
            FieldKey::Phone => 2,
            FieldKey::Company => 3,
            FieldKey::Position => 4,
            FieldKey::Value => 5,
            FieldKey::Stage => 6,
            FieldKey::Temperature => 7,
            FieldKey::Source => 8,
            FieldKey::NextContact => 9,
            FieldKey::Cep => 10,
            FieldKey::Address => 11,
            FieldKey::City => 12,
            FieldKey::State => 13,
            FieldKey::Notes => 14,
        };
        &LEAD_FIELDS[idx]
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lead field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for FieldKey {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LEAD_FIELDS
            .iter()
            .map(|f| f.key)
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}
