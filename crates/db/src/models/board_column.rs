use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::board_column,
    models::{cascade, change_log::ChangeLog},
    types::{ChangeOp, Table},
};

#[derive(Debug, Error)]
pub enum ColumnError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Column not found")]
    ColumnNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardColumn {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub color: Option<String>,
    pub position: i64,
    pub wip_limit: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateColumn {
    pub board_id: i64,
    pub title: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateColumn {
    pub title: Option<String>,
    pub color: Option<String>,
}

impl BoardColumn {
    fn from_model(model: board_column::Model) -> Self {
        Self {
            id: model.id,
            board_id: model.board_id,
            title: model.title,
            color: model.color,
            position: model.position,
            wip_limit: model.wip_limit,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_board<C: ConnectionTrait>(
        db: &C,
        board_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = board_column::Entity::find()
            .filter(board_column::Column::BoardId.eq(board_id))
            .order_by_asc(board_column::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = board_column::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateColumn,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let max_position: Option<i64> = board_column::Entity::find()
            .select_only()
            .column_as(board_column::Column::Position.max(), "max_position")
            .filter(board_column::Column::BoardId.eq(data.board_id))
            .into_tuple()
            .one(&txn)
            .await?
            .flatten();

        let now = Utc::now();
        let active = board_column::ActiveModel {
            board_id: Set(data.board_id),
            title: Set(data.title.clone()),
            color: Set(data.color.clone()),
            position: Set(max_position.unwrap_or(-1) + 1),
            wip_limit: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Columns, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateColumn,
    ) -> Result<Self, ColumnError> {
        let txn = db.begin().await?;

        let record = board_column::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(ColumnError::ColumnNotFound)?;

        let mut active: board_column::ActiveModel = record.into();
        if let Some(title) = payload.title.clone() {
            active.title = Set(title);
        }
        if payload.color.is_some() {
            active.color = Set(payload.color.clone());
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Columns, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(updated))
    }

    pub async fn set_wip_limit<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        wip_limit: Option<i64>,
    ) -> Result<(), ColumnError> {
        let txn = db.begin().await?;

        let record = board_column::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(ColumnError::ColumnNotFound)?;

        let mut active: board_column::ActiveModel = record.into();
        active.wip_limit = Set(wip_limit);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Columns, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn reorder<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        ordered_ids: &[i64],
    ) -> Result<(), DbErr> {
        let txn = db.begin().await?;

        for (index, id) in ordered_ids.iter().enumerate() {
            board_column::Entity::update_many()
                .col_expr(
                    board_column::Column::Position,
                    sea_orm::sea_query::Expr::value(index as i64),
                )
                .col_expr(
                    board_column::Column::UpdatedAt,
                    sea_orm::sea_query::Expr::value(Utc::now()),
                )
                .filter(board_column::Column::Id.eq(*id))
                .exec(&txn)
                .await?;
        }

        if !ordered_ids.is_empty() {
            ChangeLog::record(&txn, Table::Columns, ChangeOp::Update, None).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    /// Deletes the column and every task it contains, children included.
    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;

        cascade::delete_column_contents(&txn, id).await?;

        let result = board_column::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::Columns, ChangeOp::Delete, Some(id)).await?;
        }

        txn.commit().await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::{
        entities::task,
        models::{
            board::{Board, CreateBoard},
            project::{CreateProject, Project},
            task::{CreateTask, Task},
        },
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn make_board(db: &sea_orm::DatabaseConnection) -> Board {
        let project = Project::create(
            db,
            &CreateProject {
                name: "p".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Board::create(
            db,
            &CreateBoard {
                project_id: project.id,
                name: "b".to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_appends_after_default_columns() {
        let db = setup_db().await;
        let board = make_board(&db).await;

        let created = BoardColumn::create(
            &db,
            &CreateColumn {
                board_id: board.id,
                title: "Review".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(created.position, 3);
        assert_eq!(created.wip_limit, None);
    }

    #[tokio::test]
    async fn set_wip_limit_round_trips() {
        let db = setup_db().await;
        let board = make_board(&db).await;
        let columns = BoardColumn::find_by_board(&db, board.id).await.unwrap();

        BoardColumn::set_wip_limit(&db, columns[0].id, Some(5))
            .await
            .unwrap();
        let reloaded = BoardColumn::find_by_id(&db, columns[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.wip_limit, Some(5));

        BoardColumn::set_wip_limit(&db, columns[0].id, None)
            .await
            .unwrap();
        let reloaded = BoardColumn::find_by_id(&db, columns[0].id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.wip_limit, None);
    }

    #[tokio::test]
    async fn delete_removes_contained_tasks() {
        let db = setup_db().await;
        let board = make_board(&db).await;
        let columns = BoardColumn::find_by_board(&db, board.id).await.unwrap();

        Task::create(
            &db,
            &CreateTask {
                board_id: board.id,
                column_id: columns[0].id,
                title: "t".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Task::create(
            &db,
            &CreateTask {
                board_id: board.id,
                column_id: columns[1].id,
                title: "other".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        BoardColumn::delete(&db, columns[0].id).await.unwrap();

        let remaining = task::Entity::find().all(&db).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "other");
    }
}
