use chrono::{DateTime, Utc};
use sea_orm::sea_query::ExprTrait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::{task, template},
    models::change_log::ChangeLog,
    types::{ChangeOp, Priority, Table},
};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Template not found")]
    TemplateNotFound,
}

/// The reusable part of a task. Identity, placement, archive and completion
/// state stay behind when a task becomes a template.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskSnapshot {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub label_ids: Vec<i64>,
    #[serde(default)]
    pub cover_image_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub project_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub task_data: TaskSnapshot,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl Template {
    fn from_model(model: template::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            name: model.name,
            description: model.description,
            task_data: serde_json::from_value(model.task_data).unwrap_or_default(),
            usage_count: model.usage_count,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// With a project id, returns that project's templates plus the global
    /// ones; without, everything.
    pub async fn find<C: ConnectionTrait>(
        db: &C,
        project_id: Option<i64>,
    ) -> Result<Vec<Self>, DbErr> {
        let mut select = template::Entity::find();
        if let Some(project_id) = project_id {
            select = select.filter(
                template::Column::ProjectId
                    .eq(project_id)
                    .or(template::Column::ProjectId.is_null()),
            );
        }
        let records = select
            .order_by_asc(template::Column::Name)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = template::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    /// Snapshots an existing task into a named template. Returns `None` when
    /// the task is gone.
    pub async fn create_from_task<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        name: &str,
        description: Option<&str>,
        project_id: Option<i64>,
    ) -> Result<Option<Self>, DbErr> {
        let Some(task_model) = task::Entity::find_by_id(task_id).one(db).await? else {
            return Ok(None);
        };

        let snapshot = TaskSnapshot {
            title: task_model.title,
            description: task_model.description,
            priority: task_model.priority,
            assignees: serde_json::from_value(task_model.assignees).unwrap_or_default(),
            due_date: task_model.due_date,
            label_ids: serde_json::from_value(task_model.label_ids).unwrap_or_default(),
            cover_image_id: task_model.cover_image_id,
        };
        let task_data =
            serde_json::to_value(&snapshot).map_err(|err| DbErr::Custom(err.to_string()))?;

        let txn = db.begin().await?;
        let now = Utc::now();
        let active = template::ActiveModel {
            project_id: Set(project_id),
            name: Set(name.to_string()),
            description: Set(description.map(str::to_string)),
            task_data: Set(task_data),
            usage_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Templates, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Some(Self::from_model(model)))
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateTemplate,
    ) -> Result<Self, TemplateError> {
        let txn = db.begin().await?;

        let record = template::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(TemplateError::TemplateNotFound)?;

        let mut active: template::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Templates, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(updated))
    }

    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;
        let result = template::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::Templates, ChangeOp::Delete, Some(id)).await?;
        }
        txn.commit().await?;
        Ok(result.rows_affected)
    }
}
