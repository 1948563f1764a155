use serde::Serialize;
use tracing::debug;

use crate::fields::{CanonicalField, FieldKey, REQUIRED_MARKER};
use crate::tokenizer::HeaderRow;
use crate::{ImportResult, LeadImportError};

/// Source column -> canonical field assignment.
///
/// Each column targets at most one field and each field is targeted by at
/// most one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMapping {
    columns: Vec<String>,
    targets: Vec<Option<FieldKey>>,
}

impl FieldMapping {
    /// A mapping with every column unassigned.
    pub fn unmapped(header: &HeaderRow) -> Self {
        Self {
            columns: header.iter().map(str::to_string).collect(),
            targets: vec![None; header.len()],
        }
    }

    /// Guess a field for every column by label containment.
    ///
    /// The lowercased column name and the lowercased label (required marker
    /// removed) match when either contains the other. Fields are tried in
    /// catalogue order; a field already claimed by an earlier column is
    /// skipped.
    pub fn auto_map(header: &HeaderRow, fields: &[CanonicalField]) -> Self {
        let mut mapping = Self::unmapped(header);
        let labels: Vec<(FieldKey, String)> = fields
            .iter()
            .map(|f| (f.key, comparable(f.label)))
            .collect();

        for (idx, column) in header.iter().enumerate() {
            let column = comparable(column);
            if column.is_empty() {
                continue;
            }
            let hit = labels.iter().find(|(key, label)| {
                !label.is_empty()
                    && mapping.column_of(*key).is_none()
                    && (column.contains(label.as_str()) || label.contains(column.as_str()))
            });
            if let Some((key, _)) = hit {
                debug!(column = %header.get(idx).unwrap_or_default(), field = %key, "auto-mapped column");
                mapping.targets[idx] = Some(*key);
            }
        }

        mapping
    }

    /// Assign `column` to `field`, or clear it with `None`. Whatever column
    /// held `field` before loses it.
    pub fn set(&mut self, column: &str, field: Option<FieldKey>) -> ImportResult<()> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| LeadImportError::UnknownColumn(column.to_string()))?;
        if let Some(key) = field {
            for target in self.targets.iter_mut() {
                if *target == Some(key) {
                    *target = None;
                }
            }
        }
        self.targets[idx] = field;
        Ok(())
    }

    pub fn field_for(&self, column_idx: usize) -> Option<FieldKey> {
        self.targets.get(column_idx).copied().flatten()
    }

    /// Index of the column mapped to `key`.
    pub fn column_of(&self, key: FieldKey) -> Option<usize> {
        self.targets.iter().position(|t| *t == Some(key))
    }

    pub fn is_mapped(&self, key: FieldKey) -> bool {
        self.column_of(key).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<FieldKey>)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.targets.iter().copied())
    }

    /// Fails on the first required field with no column.
    pub fn validate(&self, fields: &[CanonicalField]) -> ImportResult<()> {
        match fields.iter().find(|f| f.required && !self.is_mapped(f.key)) {
            Some(f) => Err(LeadImportError::MissingRequiredField(f.key)),
            None => Ok(()),
        }
    }
}

fn comparable(text: &str) -> String {
    text.trim()
        .trim_end_matches(REQUIRED_MARKER)
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::LEAD_FIELDS;

    fn header(cols: &[&str]) -> HeaderRow {
        HeaderRow::from_cells(cols.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn maps_by_label_containment() {
        let h = header(&["NOME COMPLETO", "email", "Telefone Celular", "Data Próximo Contato", "Xyz"]);
        let m = FieldMapping::auto_map(&h, LEAD_FIELDS);
        assert_eq!(m.field_for(0), Some(FieldKey::Name));
        assert_eq!(m.field_for(1), Some(FieldKey::Email));
        assert_eq!(m.field_for(2), Some(FieldKey::Phone));
        assert_eq!(m.field_for(3), Some(FieldKey::NextContact));
        assert_eq!(m.field_for(4), None);
    }

    #[test]
    fn template_labels_map_back() {
        let labels: Vec<String> = LEAD_FIELDS.iter().map(|f| f.display_label()).collect();
        let h = HeaderRow::from_cells(labels).unwrap();
        let m = FieldMapping::auto_map(&h, LEAD_FIELDS);
        for (idx, field) in LEAD_FIELDS.iter().enumerate() {
            assert_eq!(m.field_for(idx), Some(field.key));
        }
    }

    #[test]
    fn short_column_name_contained_in_label() {
        let h = header(&["Temp"]);
        let m = FieldMapping::auto_map(&h, LEAD_FIELDS);
        assert_eq!(m.field_for(0), Some(FieldKey::Temperature));
    }

    #[test]
    fn a_field_is_claimed_once() {
        let h = header(&["Email", "Email secundário"]);
        let m = FieldMapping::auto_map(&h, LEAD_FIELDS);
        assert_eq!(m.field_for(0), Some(FieldKey::Email));
        assert_eq!(m.field_for(1), None);
    }

    #[test]
    fn remap_moves_the_field() {
        let h = header(&["Email", "Contato"]);
        let mut m = FieldMapping::auto_map(&h, LEAD_FIELDS);
        m.set("Contato", Some(FieldKey::Email)).unwrap();
        assert_eq!(m.field_for(0), None);
        assert_eq!(m.column_of(FieldKey::Email), Some(1));

        m.set("Contato", None).unwrap();
        assert!(!m.is_mapped(FieldKey::Email));
        assert!(matches!(
            m.set("Fax", Some(FieldKey::Phone)),
            Err(LeadImportError::UnknownColumn(_))
        ));
    }

    #[test]
    fn repeated_column_names_can_each_be_remapped() {
        let h = header(&["Nome", "Email", "Email"]);
        let mut m = FieldMapping::auto_map(&h, LEAD_FIELDS);
        assert_eq!(m.column_of(FieldKey::Email), Some(1));
        assert_eq!(m.field_for(2), None);

        m.set("Email (2)", Some(FieldKey::Email)).unwrap();
        assert_eq!(m.column_of(FieldKey::Email), Some(2));
        assert_eq!(m.field_for(1), None);
    }

    #[test]
    fn validate_reports_missing_required() {
        let h = header(&["Nome", "Telefone"]);
        let m = FieldMapping::auto_map(&h, LEAD_FIELDS);
        assert!(matches!(
            m.validate(LEAD_FIELDS),
            Err(LeadImportError::MissingRequiredField(FieldKey::Email))
        ));

        let h = header(&["Nome", "Email"]);
        assert!(FieldMapping::auto_map(&h, LEAD_FIELDS).validate(LEAD_FIELDS).is_ok());
    }
}
