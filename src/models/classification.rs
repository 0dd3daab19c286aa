//! Classification vocabulary for part master items.
//!
//! Every item is classified by division, industry and part group. These
//! enums are the closed sets the code registry accepts; the store keeps their
//! string form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

/// Top-level division letter (first code segment).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum Division {
    A,
    B,
    C,
    D,
    E,
}

/// Industry the part belongs to (second code segment).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum IndustryCode {
    /// Electric vehicle
    E,
    /// Hydrogen
    H,
    /// IT
    I,
}

impl IndustryCode {
    /// Human readable label shown next to the letter, e.g. `E 전기차`.
    pub fn label(&self) -> &'static str {
        match self {
            IndustryCode::E => "E 전기차",
            IndustryCode::H => "H 수소",
            IndustryCode::I => "I IT",
        }
    }
}

/// Expands a stored industry letter to its display label.
///
/// Values outside the known set pass through unchanged, which also makes the
/// expansion idempotent on already-expanded labels.
pub fn industry_label(code: &str) -> String {
    IndustryCode::from_str(code)
        .map(|industry| industry.label().to_string())
        .unwrap_or_else(|_| code.to_string())
}

/// Part group catalog (third code segment).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum PartGroup {
    A00,
    B00,
    C00,
    D00,
    E00,
    F00,
    G00,
    R00,
    P00,
    S00,
    T00,
    U00,
    V00,
    X00,
}

impl PartGroup {
    pub fn description(&self) -> &'static str {
        match self {
            PartGroup::A00 => "S/Can",
            PartGroup::B00 => "Busbar",
            PartGroup::C00 => "Connector",
            PartGroup::D00 => "DummyPlate",
            PartGroup::E00 => "EndPlate",
            PartGroup::F00 => "Foldable",
            PartGroup::G00 => "Slidable",
            PartGroup::R00 => "Rollable",
            PartGroup::P00 => "PorousPlate",
            PartGroup::S00 => "SidePlate",
            PartGroup::T00 => "Tab",
            PartGroup::U00 => "Cell",
            PartGroup::V00 => "BP",
            PartGroup::X00 => "기타",
        }
    }

    /// Catalog entries as `(code, description)` pairs, in display order.
    pub fn catalog() -> Vec<(PartGroup, &'static str)> {
        PartGroup::iter().map(|g| (g, g.description())).collect()
    }
}

/// Kind of item in the part master.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum ItemType {
    #[default]
    #[serde(rename = "제품")]
    #[strum(serialize = "제품")]
    Product,
    #[serde(rename = "상품")]
    #[strum(serialize = "상품")]
    Merchandise,
    #[serde(rename = "반제품")]
    #[strum(serialize = "반제품")]
    SemiFinished,
    #[serde(rename = "원자재")]
    #[strum(serialize = "원자재")]
    RawMaterial,
    #[serde(rename = "부자재")]
    #[strum(serialize = "부자재")]
    SubsidiaryMaterial,
}

/// Lifecycle status of an item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    ToSchema,
)]
pub enum ItemStatus {
    #[default]
    #[serde(rename = "양산")]
    #[strum(serialize = "양산")]
    MassProduction,
    #[serde(rename = "개발")]
    #[strum(serialize = "개발")]
    Development,
}

/// Single-letter revision suffix, `A` through `Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "A")]
pub struct Revision(char);

impl Revision {
    pub const INITIAL: Revision = Revision('A');

    pub fn new(letter: char) -> Option<Self> {
        letter.is_ascii_uppercase().then_some(Revision(letter))
    }

    pub fn letter(&self) -> char {
        self.0
    }
}

impl Default for Revision {
    fn default() -> Self {
        Revision::INITIAL
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Revision::new(c).ok_or_else(|| format!("revision must be A-Z, got '{}'", s))
            }
            _ => Err(format!("revision must be a single letter, got '{}'", s)),
        }
    }
}

impl TryFrom<String> for Revision {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Revision> for String {
    fn from(value: Revision) -> Self {
        value.0.to_string()
    }
}
