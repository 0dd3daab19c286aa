use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One parent/child link in a bill of materials.
///
/// `electronic_code` and `parent_code` are plain strings; nothing ties them to
/// `items`, so a line may point at a code that no longer exists. The
/// `industry`, `model`, `item_type` and `item_name` columns are snapshots
/// copied when a code is selected.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "bom_lines")]
#[serde(rename_all = "camelCase")]
#[schema(as = BomLine)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub line_no: i64,
    pub industry: String,
    pub model: String,
    pub item_type: String,
    pub level: i32,
    pub parent_code: String,
    pub electronic_code: String,
    pub item_name: String,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub quantity: Decimal,
    pub unit: String,
    pub process: String,
    pub note: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if active_model.id.is_not_set() {
                active_model.id = Set(Uuid::new_v4());
            }
            if active_model.created_at.is_not_set() {
                active_model.created_at = Set(now);
            }
            if active_model.version.is_not_set() {
                active_model.version = Set(1);
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}
