use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    entities::comment,
    models::change_log::ChangeLog,
    types::{ChangeOp, Table},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub author: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    fn from_model(model: comment::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            author: model.author,
            author_avatar: model.author_avatar,
            content: model.content,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    /// Newest first.
    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = comment::Entity::find()
            .filter(comment::Column::TaskId.eq(task_id))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn add<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        author: &str,
        author_avatar: Option<&str>,
        content: &str,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let now = Utc::now();
        let active = comment::ActiveModel {
            task_id: Set(task_id),
            author: Set(author.to_string()),
            author_avatar: Set(author_avatar.map(str::to_string)),
            content: Set(content.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Comments, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn update_content<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        content: &str,
    ) -> Result<(), DbErr> {
        let Some(record) = comment::Entity::find_by_id(id).one(db).await? else {
            return Ok(());
        };

        let txn = db.begin().await?;
        let mut active: comment::ActiveModel = record.into();
        active.content = Set(content.to_string());
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Comments, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;
        let result = comment::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::Comments, ChangeOp::Delete, Some(id)).await?;
        }
        txn.commit().await?;
        Ok(result.rows_affected)
    }
}
