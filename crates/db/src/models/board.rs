use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::{board, board_column},
    models::{cascade, change_log::ChangeLog},
    types::{ChangeOp, Table},
};

/// Every new board starts with the same three columns.
const DEFAULT_COLUMNS: [(&str, &str); 3] = [
    ("To Do", "#f97316"),
    ("In Progress", "#fbbf24"),
    ("Done", "#22c55e"),
];

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Board not found")]
    BoardNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub starred: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBoard {
    pub project_id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Board {
    fn from_model(model: board::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            name: model.name,
            description: model.description,
            starred: model.starred,
            position: model.position,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_project<C: ConnectionTrait>(
        db: &C,
        project_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = board::Entity::find()
            .filter(board::Column::ProjectId.eq(project_id))
            .order_by_asc(board::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = board::Entity::find()
            .order_by_asc(board::Column::ProjectId)
            .order_by_asc(board::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_starred<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = board::Entity::find()
            .filter(board::Column::Starred.eq(true))
            .order_by_asc(board::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = board::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    /// Creates the board plus its three starter columns in one transaction.
    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateBoard,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let max_position: Option<i64> = board::Entity::find()
            .select_only()
            .column_as(board::Column::Position.max(), "max_position")
            .filter(board::Column::ProjectId.eq(data.project_id))
            .into_tuple()
            .one(&txn)
            .await?
            .flatten();

        let now = Utc::now();
        let active = board::ActiveModel {
            project_id: Set(data.project_id),
            name: Set(data.name.clone()),
            description: Set(data.description.clone()),
            starred: Set(false),
            position: Set(max_position.unwrap_or(-1) + 1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        for (index, (title, color)) in DEFAULT_COLUMNS.iter().enumerate() {
            let column = board_column::ActiveModel {
                board_id: Set(model.id),
                title: Set(title.to_string()),
                color: Set(Some(color.to_string())),
                position: Set(index as i64),
                wip_limit: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            column.insert(&txn).await?;
        }

        ChangeLog::record(&txn, Table::Boards, ChangeOp::Insert, Some(model.id)).await?;
        ChangeLog::record(&txn, Table::Columns, ChangeOp::Insert, None).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateBoard,
    ) -> Result<Self, BoardError> {
        let txn = db.begin().await?;

        let record = board::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(BoardError::BoardNotFound)?;

        let mut active: board::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if payload.description.is_some() {
            active.description = Set(payload.description.clone());
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Boards, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(updated))
    }

    pub async fn toggle_star<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<bool, BoardError> {
        let txn = db.begin().await?;

        let record = board::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(BoardError::BoardNotFound)?;

        let starred = !record.starred;
        let mut active: board::ActiveModel = record.into();
        active.starred = Set(starred);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Boards, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(starred)
    }

    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;

        cascade::delete_board_contents(&txn, id).await?;

        let result = board::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::Boards, ChangeOp::Delete, Some(id)).await?;
        }

        txn.commit().await?;
        Ok(result.rows_affected)
    }
}
