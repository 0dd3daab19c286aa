use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    entities::bom_line,
    errors::ServiceError,
    metrics::REGISTRY_METRICS,
    models::SortOrder,
    services::{
        bom_linker::{attach_code, attach_parent, validate_for_save},
        contains_ci,
        items::ItemService,
        non_empty, unmatched_update, BulkResult,
    },
};

/// Fields of a new BOM line. Everything but the code and name has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BomLineDraft {
    /// Display number; the next free number is used when omitted.
    #[serde(default, alias = "no")]
    pub line_no: Option<i64>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub parent_code: Option<String>,
    #[serde(default)]
    pub electronic_code: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl BomLineDraft {
    fn into_model(self, line_no: i64) -> bom_line::Model {
        let now = Utc::now();
        bom_line::Model {
            id: Uuid::new_v4(),
            line_no,
            industry: self.industry.unwrap_or_default(),
            model: self.model.unwrap_or_default(),
            item_type: self.item_type.unwrap_or_default(),
            level: self.level.unwrap_or(1),
            parent_code: self.parent_code.unwrap_or_default(),
            electronic_code: self.electronic_code.trim().to_string(),
            item_name: self.item_name,
            quantity: self.quantity.unwrap_or(Decimal::ZERO),
            unit: non_empty(&self.unit).unwrap_or("EA").to_string(),
            process: self.process.unwrap_or_default(),
            note: self.note.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }
}

/// Partial edit of a BOM line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BomLinePatch {
    #[serde(default)]
    pub expected_version: Option<i32>,
    #[serde(default, alias = "no")]
    pub line_no: Option<i64>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub level: Option<i32>,
    #[serde(default)]
    pub parent_code: Option<String>,
    #[serde(default)]
    pub electronic_code: Option<String>,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub quantity: Option<Decimal>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

impl BomLinePatch {
    fn apply(&self, current: &bom_line::Model) -> bom_line::Model {
        fn pick(new: &Option<String>, old: &str) -> String {
            new.clone().unwrap_or_else(|| old.to_string())
        }

        bom_line::Model {
            line_no: self.line_no.unwrap_or(current.line_no),
            industry: pick(&self.industry, &current.industry),
            model: pick(&self.model, &current.model),
            item_type: pick(&self.item_type, &current.item_type),
            level: self.level.unwrap_or(current.level),
            parent_code: pick(&self.parent_code, &current.parent_code),
            electronic_code: pick(&self.electronic_code, &current.electronic_code),
            item_name: pick(&self.item_name, &current.item_name),
            quantity: self.quantity.unwrap_or(current.quantity),
            unit: pick(&self.unit, &current.unit),
            process: pick(&self.process, &current.process),
            note: pick(&self.note, &current.note),
            author: pick(&self.author, &current.author),
            ..current.clone()
        }
    }
}

/// Body of `POST /boms/{id}/code`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectCodeRequest {
    pub electronic_code: String,
    #[serde(default)]
    pub expected_version: Option<i32>,
}

/// Body of `PUT /boms/{id}/parent`. An empty code moves the line to the top level.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetParentRequest {
    #[serde(default)]
    pub parent_code: String,
    #[serde(default)]
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BomFilter {
    pub item_type: Option<String>,
    pub level: Option<i32>,
    pub parent_code: Option<String>,
    pub electronic_code: Option<String>,
    pub item_name: Option<String>,
    pub process: Option<String>,
    pub industry: Option<String>,
    pub model: Option<String>,
    /// `asc` or `desc` by line number; falls back to the configured default.
    #[serde(alias = "sort_order")]
    pub sort_order: Option<SortOrder>,
}

impl BomFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(v) = non_empty(&self.item_type) {
            condition = condition.add(bom_line::Column::ItemType.eq(v));
        }
        if let Some(level) = self.level {
            condition = condition.add(bom_line::Column::Level.eq(level));
        }
        if let Some(v) = non_empty(&self.parent_code) {
            condition = condition.add(bom_line::Column::ParentCode.eq(v));
        }
        if let Some(v) = non_empty(&self.electronic_code) {
            condition = condition.add(contains_ci(bom_line::Column::ElectronicCode, v));
        }
        if let Some(v) = non_empty(&self.item_name) {
            condition = condition.add(contains_ci(bom_line::Column::ItemName, v));
        }
        if let Some(v) = non_empty(&self.process) {
            condition = condition.add(contains_ci(bom_line::Column::Process, v));
        }
        if let Some(v) = non_empty(&self.industry) {
            condition = condition.add(contains_ci(bom_line::Column::Industry, v));
        }
        if let Some(v) = non_empty(&self.model) {
            condition = condition.add(contains_ci(bom_line::Column::Model, v));
        }
        condition
    }
}

/// BOM registry. Uses the item registry only to look codes up.
#[derive(Clone)]
pub struct BomService {
    db: Arc<DatabaseConnection>,
    items: ItemService,
    default_sort: SortOrder,
}

impl BomService {
    pub fn new(db: Arc<DatabaseConnection>, items: ItemService) -> Self {
        Self {
            db,
            items,
            default_sort: SortOrder::Asc,
        }
    }

    pub fn with_default_sort(mut self, default_sort: SortOrder) -> Self {
        self.default_sort = default_sort;
        self
    }

    #[instrument(skip(self))]
    pub async fn list_lines(&self, filter: &BomFilter) -> Result<Vec<bom_line::Model>, ServiceError> {
        let db = &*self.db;
        let query = bom_line::Entity::find().filter(filter.condition());
        let query = match filter.sort_order.unwrap_or(self.default_sort) {
            SortOrder::Asc => query
                .order_by_asc(bom_line::Column::LineNo)
                .order_by_asc(bom_line::Column::CreatedAt),
            SortOrder::Desc => query
                .order_by_desc(bom_line::Column::LineNo)
                .order_by_desc(bom_line::Column::CreatedAt),
        };

        query.all(db).await.map_err(|e| {
            error!(error = %e, "Failed to list BOM lines");
            ServiceError::db_error(e)
        })
    }

    #[instrument(skip(self))]
    pub async fn get_line(&self, id: Uuid) -> Result<bom_line::Model, ServiceError> {
        let db = &*self.db;
        bom_line::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| {
                error!(line_id = %id, error = %e, "Failed to fetch BOM line");
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                warn!(line_id = %id, "BOM line not found");
                ServiceError::NotFound(format!("BOM line {} not found", id))
            })
    }

    async fn next_line_no(&self) -> Result<i64, ServiceError> {
        let db = &*self.db;
        let max = bom_line::Entity::find()
            .select_only()
            .column_as(bom_line::Column::LineNo.max(), "max_line_no")
            .into_tuple::<Option<i64>>()
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to read max line number");
                ServiceError::db_error(e)
            })?
            .flatten();
        Ok(max.map_or(1, |no| no + 1))
    }

    #[instrument(skip(self, draft), fields(electronic_code = %draft.electronic_code))]
    pub async fn create_line(&self, draft: BomLineDraft) -> Result<bom_line::Model, ServiceError> {
        let db = &*self.db;
        let line_no = match draft.line_no {
            Some(no) => no,
            None => self.next_line_no().await?,
        };
        let line = draft.into_model(line_no);
        validate_for_save(&line)?;

        let created = line
            .into_active_model()
            .reset_all()
            .insert(db)
            .await
            .map_err(|e| {
                error!(line_no, error = %e, "Failed to insert BOM line");
                ServiceError::db_error(e)
            })?;

        REGISTRY_METRICS.bom_lines_created.inc();
        info!(line_id = %created.id, line_no, "BOM line created");
        Ok(created)
    }

    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub async fn create_many(&self, drafts: Vec<BomLineDraft>) -> BulkResult {
        let mut result = BulkResult::default();
        for (index, draft) in drafts.into_iter().enumerate() {
            let outcome = self.create_line(draft).await.map(|line| line.id);
            result.record(index, None, outcome);
        }
        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Bulk BOM create finished"
        );
        result
    }

    #[instrument(skip(self, patch))]
    pub async fn update_line(&self, id: Uuid, patch: BomLinePatch) -> Result<bom_line::Model, ServiceError> {
        let current = self.get_line(id).await?;
        let updated = patch.apply(&current);
        self.save(current, updated, patch.expected_version).await
    }

    /// Copies the catalog entry for `code` onto the line and saves it. An
    /// unknown code leaves the line as it was.
    #[instrument(skip(self))]
    pub async fn select_code(
        &self,
        id: Uuid,
        code: &str,
        expected_version: Option<i32>,
    ) -> Result<bom_line::Model, ServiceError> {
        let current = self.get_line(id).await?;
        check_version(&current, expected_version)?;
        let found = self.items.find_by_code(code.trim()).await?;

        let Some(item) = found else {
            info!(line_id = %id, code, "No item for selected code, line unchanged");
            return Ok(current);
        };

        let updated = attach_code(current.clone(), code.trim(), std::slice::from_ref(&item));
        self.save(current, updated, expected_version).await
    }

    #[instrument(skip(self))]
    pub async fn set_parent(
        &self,
        id: Uuid,
        parent_code: &str,
        expected_version: Option<i32>,
    ) -> Result<bom_line::Model, ServiceError> {
        let current = self.get_line(id).await?;
        let updated = attach_parent(current.clone(), parent_code.trim());
        self.save(current, updated, expected_version).await
    }

    async fn save(
        &self,
        current: bom_line::Model,
        mut updated: bom_line::Model,
        expected_version: Option<i32>,
    ) -> Result<bom_line::Model, ServiceError> {
        let db = &*self.db;
        let id = current.id;

        check_version(&current, expected_version)?;
        validate_for_save(&updated)?;
        updated.version = current.version + 1;
        updated.updated_at = Utc::now();

        let mut query = bom_line::Entity::update(updated.into_active_model().reset_all());
        if expected_version.is_some() {
            query = query.filter(bom_line::Column::Version.eq(current.version));
        }

        let saved = query.exec(db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => {
                warn!(line_id = %id, "BOM line changed or removed underneath update");
                unmatched_update("BOM line", id, expected_version.is_some())
            }
            other => {
                error!(line_id = %id, error = %other, "Failed to update BOM line");
                ServiceError::db_error(other)
            }
        })?;

        REGISTRY_METRICS.bom_lines_updated.inc();
        info!(line_id = %id, version = saved.version, "BOM line updated");
        Ok(saved)
    }

    /// Deletes by id. Lines naming this line's code as their parent keep the
    /// now dangling `parent_code`.
    #[instrument(skip(self))]
    pub async fn delete_line(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        let result = bom_line::Entity::delete_by_id(id).exec(db).await.map_err(|e| {
            error!(line_id = %id, error = %e, "Failed to delete BOM line");
            ServiceError::db_error(e)
        })?;

        if result.rows_affected == 0 {
            warn!(line_id = %id, "BOM line not found for delete");
            return Err(ServiceError::NotFound(format!("BOM line {} not found", id)));
        }

        REGISTRY_METRICS.bom_lines_deleted.inc();
        info!(line_id = %id, "BOM line deleted");
        Ok(())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_many(&self, ids: Vec<Uuid>) -> BulkResult {
        let mut result = BulkResult::default();
        for (index, id) in ids.into_iter().enumerate() {
            let outcome = self.delete_line(id).await.map(|_| id);
            result.record(index, Some(id), outcome);
        }
        result
    }
}

/// Rejects a stale `expected_version` before any lookup or write.
fn check_version(current: &bom_line::Model, expected_version: Option<i32>) -> Result<(), ServiceError> {
    match expected_version {
        Some(expected) if expected != current.version => {
            REGISTRY_METRICS.version_conflicts.inc();
            warn!(line_id = %current.id, expected, actual = current.version, "BOM line version mismatch");
            Err(ServiceError::ConcurrentModification(current.id))
        }
        _ => Ok(()),
    }
}
