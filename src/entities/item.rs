use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Part master record. `electronic_code` is derived from the classification
/// columns and `sequence_no`; both carry unique indexes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "items")]
#[serde(rename_all = "camelCase")]
#[schema(as = Item)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sequence_no: i64,
    pub division: String,
    pub industry_code: String,
    pub part_group: String,
    pub revision: String,
    #[sea_orm(unique)]
    pub electronic_code: String,
    pub item_name: String,
    pub item_type: String,
    pub status: String,
    pub unit: String,
    pub model: String,
    pub account_code: String,
    pub note: String,
    pub author: String,
    pub registered_at: DateTime<Utc>,
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
            if active_model.registered_at.is_not_set() {
                active_model.registered_at = Set(now);
            }
            if active_model.version.is_not_set() {
                active_model.version = Set(1);
            }
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}
