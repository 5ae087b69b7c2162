use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    entities::notification,
    models::change_log::ChangeLog,
    types::{ChangeOp, NotificationType, Scope, Table},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub notification_type: NotificationType,
    pub scope: Scope,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotification {
    pub notification_type: NotificationType,
    pub scope: Scope,
    pub title: String,
    pub message: String,
}

impl Notification {
    fn from_model(model: notification::Model) -> Self {
        Self {
            id: model.id,
            notification_type: model.notification_type,
            scope: Scope::from_columns(model.scope_kind, model.scope_id),
            title: model.title,
            message: model.message,
            read: model.read,
            created_at: model.created_at,
        }
    }

    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateNotification,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let active = notification::ActiveModel {
            notification_type: Set(data.notification_type),
            scope_kind: Set(data.scope.kind()),
            scope_id: Set(data.scope.id()),
            title: Set(data.title.clone()),
            message: Set(data.message.clone()),
            read: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Notifications, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn find_recent<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Self>, DbErr> {
        let records = notification::Entity::find()
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .limit(limit)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn unread_count<C: ConnectionTrait>(db: &C) -> Result<u64, DbErr> {
        notification::Entity::find()
            .filter(notification::Column::Read.eq(false))
            .count(db)
            .await
    }

    pub async fn mark_read<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<(), DbErr> {
        let Some(record) = notification::Entity::find_by_id(id).one(db).await? else {
            return Ok(());
        };
        if record.read {
            return Ok(());
        }

        let txn = db.begin().await?;
        let mut active: notification::ActiveModel = record.into();
        active.read = Set(true);
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Notifications, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn mark_all_read<C: ConnectionTrait + TransactionTrait>(
        db: &C,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;
        let result = notification::Entity::update_many()
            .col_expr(notification::Column::Read, Expr::value(true))
            .filter(notification::Column::Read.eq(false))
            .exec(&txn)
            .await?;

        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::Notifications, ChangeOp::Update, None).await?;
        }
        txn.commit().await?;
        Ok(result.rows_affected)
    }
}
