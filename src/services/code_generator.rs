//! Electronic code derivation and item field validation.
//!
//! An electronic code is `{division}-{industry}-{partGroup}-{sequence:05}{revision}`,
//! e.g. `A-E-A00-00001A`. Everything here is pure; the item service decides
//! when to call it and persists the result.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::item,
    errors::ServiceError,
    models::{Division, IndustryCode, ItemStatus, ItemType, PartGroup, Revision},
};

/// Zero-padding width of the sequence segment. Larger numbers simply grow.
pub const SEQUENCE_WIDTH: usize = 5;

/// Builds the canonical electronic code. A missing revision means `A`.
pub fn derive_code(
    division: Division,
    industry_code: IndustryCode,
    part_group: PartGroup,
    sequence_no: i64,
    revision: Option<Revision>,
) -> String {
    format!(
        "{}-{}-{}-{:0width$}{}",
        division,
        industry_code,
        part_group,
        sequence_no,
        revision.unwrap_or_default(),
        width = SEQUENCE_WIDTH
    )
}

/// Next sequence number after the current persisted maximum.
pub fn next_sequence_no(existing_max: Option<i64>) -> i64 {
    match existing_max {
        Some(max) if max > 0 => max + 1,
        _ => 1,
    }
}

/// Identifies the record a validation message is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRef {
    Sequence(i64),
    Id(Uuid),
    Row(usize),
    New,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Sequence(no) => write!(f, "sequence {}", no),
            RecordRef::Id(id) => write!(f, "record {}", id),
            RecordRef::Row(index) => write!(f, "row {}", index),
            RecordRef::New => write!(f, "new record"),
        }
    }
}

/// The typed inputs of a code, minus the sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub division: Division,
    pub industry_code: IndustryCode,
    pub part_group: PartGroup,
    pub revision: Revision,
}

impl Classification {
    pub fn electronic_code(&self, sequence_no: i64) -> String {
        derive_code(
            self.division,
            self.industry_code,
            self.part_group,
            sequence_no,
            Some(self.revision),
        )
    }
}

/// Item fields as they arrive from a client, a JSON bulk body or a
/// spreadsheet row. Enum-valued fields stay strings until validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    /// Only honoured for explicitly numbered inserts (import, bulk).
    #[serde(default, alias = "no")]
    pub sequence_no: Option<i64>,
    #[serde(default)]
    pub division: String,
    #[serde(default, alias = "industry")]
    pub industry_code: String,
    #[serde(default)]
    pub part_group: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub account_code: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl ItemDraft {
    /// Best identifier available before the record exists.
    pub fn record_ref(&self) -> RecordRef {
        self.sequence_no
            .map(RecordRef::Sequence)
            .unwrap_or(RecordRef::New)
    }
}

/// Partial edit of an existing item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    /// When present the update only applies if the stored version matches.
    #[serde(default)]
    pub expected_version: Option<i32>,
    #[serde(default)]
    pub sequence_no: Option<i64>,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default, alias = "industry")]
    pub industry_code: Option<String>,
    #[serde(default)]
    pub part_group: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub account_code: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl ItemPatch {
    /// True when the patch edits any input of the electronic code.
    pub fn touches_classification(&self) -> bool {
        self.division.is_some()
            || self.industry_code.is_some()
            || self.part_group.is_some()
            || self.sequence_no.is_some()
            || self.revision.is_some()
    }
}

/// Validated, typed view of an [`ItemDraft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedItem {
    pub classification: Classification,
    pub item_name: String,
    pub item_type: ItemType,
    pub status: ItemStatus,
}

fn required(field: &str, value: &str, record: &RecordRef) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "{} is required ({})",
            field, record
        )));
    }
    Ok(())
}

fn parse_enum<T: FromStr>(
    field: &str,
    value: &str,
    allowed: &str,
    record: &RecordRef,
) -> Result<T, ServiceError> {
    T::from_str(value.trim()).map_err(|_| {
        ServiceError::ValidationError(format!(
            "{} '{}' is not one of {} ({})",
            field, value, allowed, record
        ))
    })
}

fn optional_enum<T: FromStr + Default>(
    field: &str,
    value: Option<&str>,
    allowed: &str,
    record: &RecordRef,
) -> Result<T, ServiceError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_enum(field, v, allowed, record),
        None => Ok(T::default()),
    }
}

/// Checks required fields and enum membership before anything reaches the
/// store. Messages name the field and the record.
pub fn validate_item_fields(
    draft: &ItemDraft,
    record: &RecordRef,
) -> Result<ValidatedItem, ServiceError> {
    required("itemName", &draft.item_name, record)?;
    required("division", &draft.division, record)?;
    required("industryCode", &draft.industry_code, record)?;
    required("partGroup", &draft.part_group, record)?;

    if let Some(no) = draft.sequence_no {
        if no < 1 {
            return Err(ServiceError::ValidationError(format!(
                "sequenceNo must be at least 1, got {} ({})",
                no, record
            )));
        }
    }

    let division = parse_enum("division", &draft.division, "A-E", record)?;
    let industry_code = parse_enum("industryCode", &draft.industry_code, "E, H, I", record)?;
    let part_group = parse_enum("partGroup", &draft.part_group, "the part group catalog", record)?;
    let revision = optional_enum("revision", draft.revision.as_deref(), "A-Z", record)?;
    let item_type = optional_enum(
        "itemType",
        draft.item_type.as_deref(),
        "제품, 상품, 반제품, 원자재, 부자재",
        record,
    )?;
    let status = optional_enum("status", draft.status.as_deref(), "양산, 개발", record)?;

    Ok(ValidatedItem {
        classification: Classification {
            division,
            industry_code,
            part_group,
            revision,
        },
        item_name: draft.item_name.trim().to_string(),
        item_type,
        status,
    })
}

/// Merges a patch into the stored item and re-validates the result. When the
/// patch touches the classification the electronic code is re-derived.
pub fn apply_patch(current: &item::Model, patch: &ItemPatch) -> Result<item::Model, ServiceError> {
    let pick = |new: &Option<String>, old: &str| new.clone().unwrap_or_else(|| old.to_string());

    let merged = ItemDraft {
        sequence_no: Some(patch.sequence_no.unwrap_or(current.sequence_no)),
        division: pick(&patch.division, &current.division),
        industry_code: pick(&patch.industry_code, &current.industry_code),
        part_group: pick(&patch.part_group, &current.part_group),
        revision: Some(pick(&patch.revision, &current.revision)),
        item_name: pick(&patch.item_name, &current.item_name),
        item_type: Some(pick(&patch.item_type, &current.item_type)),
        status: Some(pick(&patch.status, &current.status)),
        unit: None,
        model: None,
        account_code: None,
        note: None,
        author: None,
    };
    let sequence_no = merged.sequence_no.unwrap_or(current.sequence_no);
    let validated = validate_item_fields(&merged, &RecordRef::Sequence(current.sequence_no))?;
    let classification = validated.classification;

    let mut updated = current.clone();
    updated.sequence_no = sequence_no;
    updated.division = classification.division.to_string();
    updated.industry_code = classification.industry_code.to_string();
    updated.part_group = classification.part_group.to_string();
    updated.revision = classification.revision.to_string();
    updated.item_name = validated.item_name;
    updated.item_type = validated.item_type.to_string();
    updated.status = validated.status.to_string();
    updated.unit = pick(&patch.unit, &current.unit);
    updated.model = pick(&patch.model, &current.model);
    updated.account_code = pick(&patch.account_code, &current.account_code);
    updated.note = pick(&patch.note, &current.note);
    updated.author = pick(&patch.author, &current.author);

    if patch.touches_classification() {
        updated.electronic_code = classification.electronic_code(sequence_no);
    }

    Ok(updated)
}
