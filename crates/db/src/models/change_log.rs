use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::change_log;
use crate::types::{ChangeOp, Table};

/// Transactional outbox for table-level change notifications. Every mutation
/// appends rows here inside its own transaction; the live-query flush worker
/// drains them and re-evaluates affected subscriptions.
pub struct ChangeLog;

impl ChangeLog {
    pub async fn record<C: ConnectionTrait>(
        db: &C,
        table: Table,
        op: ChangeOp,
        entity_id: Option<i64>,
    ) -> Result<(), DbErr> {
        let active = change_log::ActiveModel {
            table_name: Set(table),
            op: Set(op),
            entity_id: Set(entity_id),
            created_at: Set(Utc::now()),
            published_at: Set(None),
            ..Default::default()
        };
        active.insert(db).await?;
        Ok(())
    }

    pub async fn fetch_unpublished<C: ConnectionTrait>(
        db: &C,
        limit: u64,
    ) -> Result<Vec<change_log::Model>, DbErr> {
        change_log::Entity::find()
            .filter(change_log::Column::PublishedAt.is_null())
            .order_by_asc(change_log::Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn mark_published<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<(), DbErr> {
        if ids.is_empty() {
            return Ok(());
        }
        change_log::Entity::update_many()
            .col_expr(
                change_log::Column::PublishedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(change_log::Column::Id.is_in(ids.to_vec()))
            .exec(db)
            .await?;
        Ok(())
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
    async fn record_fetch_and_mark_published() {
        let db = setup_db().await;

        ChangeLog::record(&db, Table::Tasks, ChangeOp::Insert, Some(1))
            .await
            .unwrap();
        ChangeLog::record(&db, Table::Boards, ChangeOp::Update, Some(2))
            .await
            .unwrap();

        let entries = ChangeLog::fetch_unpublished(&db, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].table_name, Table::Tasks);
        assert_eq!(entries[1].table_name, Table::Boards);

        let first_id = entries[0].id;
        ChangeLog::mark_published(&db, &[first_id]).await.unwrap();

        let entries = ChangeLog::fetch_unpublished(&db, 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].table_name, Table::Boards);
        assert_eq!(entries[0].op, ChangeOp::Update);

        ChangeLog::mark_published(&db, &[entries[0].id])
            .await
            .unwrap();
        assert!(
            ChangeLog::fetch_unpublished(&db, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn mark_published_with_no_ids_is_a_no_op() {
        let db = setup_db().await;
        ChangeLog::mark_published(&db, &[]).await.unwrap();
    }
}
