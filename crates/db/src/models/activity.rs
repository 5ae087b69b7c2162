use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JsonValue, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    entities::activity,
    models::change_log::ChangeLog,
    types::{ActivityType, ChangeOp, Scope, ScopeKind, Table},
};

/// Append-only audit trail. Rows are only removed when their parent entity
/// is cascade-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub scope: Scope,
    pub activity_type: ActivityType,
    pub actor: String,
    pub metadata: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    fn from_model(model: activity::Model) -> Self {
        Self {
            id: model.id,
            scope: Scope::from_columns(model.scope_kind, model.scope_id),
            activity_type: model.activity_type,
            actor: model.actor,
            metadata: model.metadata,
            created_at: model.created_at,
        }
    }

    pub async fn log<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        scope: Scope,
        activity_type: ActivityType,
        actor: &str,
        metadata: JsonValue,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let active = activity::ActiveModel {
            scope_kind: Set(scope.kind()),
            scope_id: Set(scope.id()),
            activity_type: Set(activity_type),
            actor: Set(actor.to_string()),
            metadata: Set(metadata),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Activities, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    /// Newest first.
    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = activity::Entity::find()
            .filter(activity::Column::ScopeKind.eq(ScopeKind::Task))
            .filter(activity::Column::ScopeId.eq(task_id))
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_recent<C: ConnectionTrait>(db: &C, limit: u64) -> Result<Vec<Self>, DbErr> {
        let records = activity::Entity::find()
            .order_by_desc(activity::Column::CreatedAt)
            .order_by_desc(activity::Column::Id)
            .limit(limit)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn log_and_read_back_by_task() {
        let db = setup_db().await;

        Activity::log(
            &db,
            Scope::Task(7),
            ActivityType::TaskCreated,
            "alice",
            serde_json::json!({ "title": "T1" }),
        )
        .await
        .unwrap();
        Activity::log(
            &db,
            Scope::Task(7),
            ActivityType::TaskMoved,
            "alice",
            serde_json::json!({ "from": "To Do", "to": "Done" }),
        )
        .await
        .unwrap();
        Activity::log(
            &db,
            Scope::Board(3),
            ActivityType::TaskArchived,
            "bob",
            serde_json::json!({}),
        )
        .await
        .unwrap();

        let task_activities = Activity::find_by_task(&db, 7).await.unwrap();
        assert_eq!(task_activities.len(), 2);
        assert_eq!(task_activities[0].activity_type, ActivityType::TaskMoved);
        assert_eq!(task_activities[0].scope, Scope::Task(7));

        let recent = Activity::find_recent(&db, 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].scope, Scope::Board(3));
    }

    #[tokio::test]
    async fn global_scope_round_trips_through_nullable_columns() {
        let db = setup_db().await;

        Activity::log(
            &db,
            Scope::Global,
            ActivityType::TaskDeleted,
            "system",
            serde_json::json!({}),
        )
        .await
        .unwrap();

        let recent = Activity::find_recent(&db, 10).await.unwrap();
        assert_eq!(recent[0].scope, Scope::Global);
    }
}
