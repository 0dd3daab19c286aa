pub mod classification;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

pub use classification::{
    industry_label, Division, IndustryCode, ItemStatus, ItemType, PartGroup, Revision,
};

/// Listing direction for sequence and line numbers.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}
