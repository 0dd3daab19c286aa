use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    entities::item,
    errors::ServiceError,
    metrics::REGISTRY_METRICS,
    models::SortOrder,
    services::{
        code_generator::{
            apply_patch, next_sequence_no, validate_item_fields, ItemDraft, ItemPatch,
            RecordRef, ValidatedItem,
        },
        contains_ci, non_empty, unmatched_update, BulkResult,
    },
};

const DEFAULT_UNIT: &str = "EA";

/// Conjunctive item filter. Classification fields match exactly, free-text
/// fields match case-insensitive substrings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemFilter {
    pub division: Option<String>,
    #[serde(alias = "industry")]
    pub industry_code: Option<String>,
    pub part_group: Option<String>,
    pub item_type: Option<String>,
    pub status: Option<String>,
    pub electronic_code: Option<String>,
    pub item_name: Option<String>,
    pub model: Option<String>,
    /// `asc` or `desc` by sequence number; falls back to the configured default.
    #[serde(alias = "sort_order")]
    pub sort_order: Option<SortOrder>,
}

impl ItemFilter {
    fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(v) = non_empty(&self.division) {
            condition = condition.add(item::Column::Division.eq(v));
        }
        if let Some(v) = non_empty(&self.industry_code) {
            condition = condition.add(item::Column::IndustryCode.eq(v));
        }
        if let Some(v) = non_empty(&self.part_group) {
            condition = condition.add(item::Column::PartGroup.eq(v));
        }
        if let Some(v) = non_empty(&self.item_type) {
            condition = condition.add(item::Column::ItemType.eq(v));
        }
        if let Some(v) = non_empty(&self.status) {
            condition = condition.add(item::Column::Status.eq(v));
        }
        if let Some(v) = non_empty(&self.electronic_code) {
            condition = condition.add(contains_ci(item::Column::ElectronicCode, v));
        }
        if let Some(v) = non_empty(&self.item_name) {
            condition = condition.add(contains_ci(item::Column::ItemName, v));
        }
        if let Some(v) = non_empty(&self.model) {
            condition = condition.add(contains_ci(item::Column::Model, v));
        }
        condition
    }
}

/// Code registry: stores items and owns sequence numbering.
#[derive(Clone)]
pub struct ItemService {
    db: Arc<DatabaseConnection>,
    create_retry_limit: u32,
    default_sort: SortOrder,
}

impl ItemService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            create_retry_limit: 3,
            default_sort: SortOrder::Asc,
        }
    }

    /// Overrides the retry budget for auto-numbered creates and the listing
    /// order used when a request does not choose one.
    pub fn with_policy(mut self, create_retry_limit: u32, default_sort: SortOrder) -> Self {
        self.create_retry_limit = create_retry_limit;
        self.default_sort = default_sort;
        self
    }

    #[instrument(skip(self))]
    pub async fn list_items(&self, filter: &ItemFilter) -> Result<Vec<item::Model>, ServiceError> {
        let db = &*self.db;
        let query = item::Entity::find().filter(filter.condition());
        let query = match filter.sort_order.unwrap_or(self.default_sort) {
            SortOrder::Asc => query.order_by_asc(item::Column::SequenceNo),
            SortOrder::Desc => query.order_by_desc(item::Column::SequenceNo),
        };

        query.all(db).await.map_err(|e| {
            error!(error = %e, "Failed to list items");
            ServiceError::db_error(e)
        })
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, id: Uuid) -> Result<item::Model, ServiceError> {
        let db = &*self.db;
        item::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(|e| {
                error!(item_id = %id, error = %e, "Failed to fetch item");
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                warn!(item_id = %id, "Item not found");
                ServiceError::NotFound(format!("Item {} not found", id))
            })
    }

    /// Exact match on the electronic code. A miss is `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<Option<item::Model>, ServiceError> {
        let db = &*self.db;
        item::Entity::find()
            .filter(item::Column::ElectronicCode.eq(code))
            .one(db)
            .await
            .map_err(|e| {
                error!(code, error = %e, "Failed to look up item by code");
                ServiceError::db_error(e)
            })
    }

    /// Current persisted maximum sequence number.
    #[instrument(skip(self))]
    pub async fn last_sequence_no(&self) -> Result<Option<i64>, ServiceError> {
        let db = &*self.db;
        item::Entity::find()
            .select_only()
            .column_as(item::Column::SequenceNo.max(), "max_sequence_no")
            .into_tuple::<Option<i64>>()
            .one(db)
            .await
            .map(Option::flatten)
            .map_err(|e| {
                error!(error = %e, "Failed to read max sequence number");
                ServiceError::db_error(e)
            })
    }

    /// Lexicographically greatest electronic code.
    #[instrument(skip(self))]
    pub async fn last_code(&self) -> Result<Option<String>, ServiceError> {
        let db = &*self.db;
        item::Entity::find()
            .order_by_desc(item::Column::ElectronicCode)
            .one(db)
            .await
            .map(|found| found.map(|item| item.electronic_code))
            .map_err(|e| {
                error!(error = %e, "Failed to read last electronic code");
                ServiceError::db_error(e)
            })
    }

    /// Creates an item with the next free sequence number.
    ///
    /// A losing race against another create shows up as `DuplicateKey` from
    /// the unique index; the maximum is re-read and the insert retried up to
    /// the configured limit. Any `sequence_no` on the draft is ignored.
    #[instrument(skip(self, draft), fields(item_name = %draft.item_name))]
    pub async fn create_item(&self, mut draft: ItemDraft) -> Result<item::Model, ServiceError> {
        draft.sequence_no = None;
        let mut retries = 0;

        loop {
            let sequence_no = next_sequence_no(self.last_sequence_no().await?);
            let validated = validate_item_fields(&draft, &RecordRef::New)?;

            match self.insert_validated(&draft, &validated, sequence_no).await {
                Ok(created) => return Ok(created),
                Err(e) if e.is_duplicate_key() && retries < self.create_retry_limit => {
                    retries += 1;
                    REGISTRY_METRICS.create_retries.inc();
                    warn!(sequence_no, retries, "Sequence number taken, retrying create");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Inserts with the draft's own sequence number. Collisions are returned
    /// as `DuplicateKey` without retrying.
    #[instrument(skip(self, draft), fields(sequence_no = ?draft.sequence_no))]
    pub async fn insert_numbered(&self, draft: ItemDraft) -> Result<item::Model, ServiceError> {
        let record = draft.record_ref();
        let sequence_no = draft.sequence_no.ok_or_else(|| {
            ServiceError::ValidationError(format!("sequenceNo is required ({})", record))
        })?;
        let validated = validate_item_fields(&draft, &record)?;
        self.insert_validated(&draft, &validated, sequence_no).await
    }

    async fn insert_validated(
        &self,
        draft: &ItemDraft,
        validated: &ValidatedItem,
        sequence_no: i64,
    ) -> Result<item::Model, ServiceError> {
        let db = &*self.db;
        let classification = validated.classification;
        let electronic_code = classification.electronic_code(sequence_no);
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        let active = item::ActiveModel {
            sequence_no: Set(sequence_no),
            division: Set(classification.division.to_string()),
            industry_code: Set(classification.industry_code.to_string()),
            part_group: Set(classification.part_group.to_string()),
            revision: Set(classification.revision.to_string()),
            electronic_code: Set(electronic_code.clone()),
            item_name: Set(validated.item_name.clone()),
            item_type: Set(validated.item_type.to_string()),
            status: Set(validated.status.to_string()),
            unit: Set(non_empty(&draft.unit).unwrap_or(DEFAULT_UNIT).to_string()),
            model: Set(text(&draft.model)),
            account_code: Set(text(&draft.account_code)),
            note: Set(text(&draft.note)),
            author: Set(text(&draft.author)),
            ..Default::default()
        };

        match active.insert(db).await {
            Ok(created) => {
                REGISTRY_METRICS.items_created.inc();
                info!(
                    item_id = %created.id,
                    sequence_no,
                    electronic_code = %created.electronic_code,
                    "Item created"
                );
                Ok(created)
            }
            Err(e) => {
                let err = ServiceError::from_write_error(
                    e,
                    format!("sequence {} / code {}", sequence_no, electronic_code),
                );
                if err.is_duplicate_key() {
                    REGISTRY_METRICS.duplicate_key_conflicts.inc();
                    warn!(sequence_no, %electronic_code, "Item insert hit a unique index");
                } else {
                    error!(sequence_no, error = %err, "Failed to insert item");
                }
                Err(err)
            }
        }
    }

    /// Numbered insert when the draft carries a `sequenceNo`, auto-numbered
    /// create otherwise.
    pub async fn create_from_draft(&self, draft: ItemDraft) -> Result<item::Model, ServiceError> {
        if draft.sequence_no.is_some() {
            self.insert_numbered(draft).await
        } else {
            self.create_item(draft).await
        }
    }

    /// Best-effort bulk create. Drafts carrying a `sequenceNo` are inserted
    /// as numbered, the rest are auto-numbered in request order.
    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub async fn create_many(&self, drafts: Vec<ItemDraft>) -> BulkResult {
        let mut result = BulkResult::default();
        for (index, draft) in drafts.into_iter().enumerate() {
            let outcome = self.create_from_draft(draft).await;
            result.record(index, None, outcome.map(|created| created.id));
        }
        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Bulk item create finished"
        );
        result
    }

    /// Applies a patch, re-deriving the electronic code when a classification
    /// field changes. With `expected_version` the write only lands if the
    /// stored version still matches.
    #[instrument(skip(self, patch))]
    pub async fn update_item(&self, id: Uuid, patch: ItemPatch) -> Result<item::Model, ServiceError> {
        let db = &*self.db;
        let current = self.get_item(id).await?;

        if let Some(expected) = patch.expected_version {
            if expected != current.version {
                REGISTRY_METRICS.version_conflicts.inc();
                warn!(item_id = %id, expected, actual = current.version, "Item version mismatch");
                return Err(ServiceError::ConcurrentModification(id));
            }
        }

        let mut updated = apply_patch(&current, &patch)?;
        updated.version = current.version + 1;
        updated.updated_at = chrono::Utc::now();

        let mut query = item::Entity::update(updated.clone().into_active_model().reset_all());
        if patch.expected_version.is_some() {
            query = query.filter(item::Column::Version.eq(current.version));
        }

        let saved = query.exec(db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated => {
                warn!(item_id = %id, "Item changed or removed underneath update");
                unmatched_update("Item", id, patch.expected_version.is_some())
            }
            other => {
                let err = ServiceError::from_write_error(
                    other,
                    format!("sequence {} / code {}", updated.sequence_no, updated.electronic_code),
                );
                if err.is_duplicate_key() {
                    REGISTRY_METRICS.duplicate_key_conflicts.inc();
                }
                error!(item_id = %id, error = %err, "Failed to update item");
                err
            }
        })?;

        REGISTRY_METRICS.items_updated.inc();
        info!(
            item_id = %id,
            version = saved.version,
            electronic_code = %saved.electronic_code,
            "Item updated"
        );
        Ok(saved)
    }

    /// Deletes by id. BOM lines referring to the code are left alone.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db;
        let result = item::Entity::delete_by_id(id).exec(db).await.map_err(|e| {
            error!(item_id = %id, error = %e, "Failed to delete item");
            ServiceError::db_error(e)
        })?;

        if result.rows_affected == 0 {
            warn!(item_id = %id, "Item not found for delete");
            return Err(ServiceError::NotFound(format!("Item {} not found", id)));
        }

        REGISTRY_METRICS.items_deleted.inc();
        info!(item_id = %id, "Item deleted");
        Ok(())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_many(&self, ids: Vec<Uuid>) -> BulkResult {
        let mut result = BulkResult::default();
        for (index, id) in ids.into_iter().enumerate() {
            let outcome = self.delete_item(id).await.map(|_| id);
            result.record(index, Some(id), outcome);
        }
        result
    }
}
