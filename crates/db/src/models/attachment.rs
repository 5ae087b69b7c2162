use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    entities::attachment,
    models::change_log::ChangeLog,
    types::{ChangeOp, Table},
};

/// Mime type used for link attachments, which carry no payload.
pub const URI_LIST_MIME: &str = "text/uri-list";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub task_id: i64,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_data: Option<Vec<u8>>,
    pub url: Option<String>,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attachment {
    fn from_model(model: attachment::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            name: model.name,
            mime_type: model.mime_type,
            size: model.size,
            blob_data: model.blob_data,
            url: model.url,
            uploaded_by: model.uploaded_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = attachment::Entity::find()
            .filter(attachment::Column::TaskId.eq(task_id))
            .order_by_asc(attachment::Column::CreatedAt)
            .order_by_asc(attachment::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn add_file<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        name: &str,
        mime_type: &str,
        data: Vec<u8>,
        uploaded_by: &str,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let now = Utc::now();
        let active = attachment::ActiveModel {
            task_id: Set(task_id),
            name: Set(name.to_string()),
            mime_type: Set(mime_type.to_string()),
            size: Set(data.len() as i64),
            blob_data: Set(Some(data)),
            url: Set(None),
            uploaded_by: Set(uploaded_by.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Attachments, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn add_url<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        name: &str,
        url: &str,
        uploaded_by: &str,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let now = Utc::now();
        let active = attachment::ActiveModel {
            task_id: Set(task_id),
            name: Set(name.to_string()),
            mime_type: Set(URI_LIST_MIME.to_string()),
            size: Set(0),
            blob_data: Set(None),
            url: Set(Some(url.to_string())),
            uploaded_by: Set(uploaded_by.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Attachments, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn remove<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;
        let result = attachment::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::Attachments, ChangeOp::Delete, Some(id)).await?;
        }
        txn.commit().await?;
        Ok(result.rows_affected)
    }
}
