use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::{board, label, task},
    models::change_log::ChangeLog,
    types::{ChangeOp, Table},
};

#[derive(Debug, Error)]
pub enum LabelError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Label not found")]
    LabelNotFound,
    #[error("Label {label_id} belongs to a different project than the task")]
    ProjectMismatch { label_id: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub color: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLabel {
    pub project_id: i64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateLabel {
    pub name: Option<String>,
    pub color: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> Result<sea_orm::JsonValue, DbErr> {
    serde_json::to_value(value).map_err(|err| DbErr::Custom(err.to_string()))
}

impl Label {
    fn from_model(model: label::Model) -> Self {
        Self {
            id: model.id,
            project_id: model.project_id,
            name: model.name,
            color: model.color,
            position: model.position,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_project<C: ConnectionTrait>(
        db: &C,
        project_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = label::Entity::find()
            .filter(label::Column::ProjectId.eq(project_id))
            .order_by_asc(label::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = label::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    /// Resolves a set of ids, preserving input order and skipping ids that
    /// no longer exist.
    pub async fn find_by_ids<C: ConnectionTrait>(db: &C, ids: &[i64]) -> Result<Vec<Self>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = label::Entity::find()
            .filter(label::Column::Id.is_in(ids.to_vec()))
            .all(db)
            .await?;
        let mut by_id: std::collections::HashMap<i64, Self> = records
            .into_iter()
            .map(|model| (model.id, Self::from_model(model)))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateLabel,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let max_position: Option<i64> = label::Entity::find()
            .select_only()
            .column_as(label::Column::Position.max(), "max_position")
            .filter(label::Column::ProjectId.eq(data.project_id))
            .into_tuple()
            .one(&txn)
            .await?
            .flatten();

        let now = Utc::now();
        let active = label::ActiveModel {
            project_id: Set(data.project_id),
            name: Set(data.name.clone()),
            color: Set(data.color.clone()),
            position: Set(max_position.unwrap_or(-1) + 1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Labels, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateLabel,
    ) -> Result<Self, LabelError> {
        let txn = db.begin().await?;

        let record = label::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(LabelError::LabelNotFound)?;

        let mut active: label::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if let Some(color) = payload.color.clone() {
            active.color = Set(color);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Labels, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(updated))
    }

    /// Deletes the label and strips its id from every task that references
    /// it, in one transaction, so no task is left pointing at a dead label.
    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;

        let Some(record) = label::Entity::find_by_id(id).one(&txn).await? else {
            txn.commit().await?;
            return Ok(0);
        };

        let board_ids: Vec<i64> = board::Entity::find()
            .select_only()
            .column(board::Column::Id)
            .filter(board::Column::ProjectId.eq(record.project_id))
            .into_tuple()
            .all(&txn)
            .await?;

        let mut stripped_any = false;
        if !board_ids.is_empty() {
            let tasks = task::Entity::find()
                .filter(task::Column::BoardId.is_in(board_ids))
                .all(&txn)
                .await?;
            for task_model in tasks {
                let label_ids: Vec<i64> =
                    serde_json::from_value(task_model.label_ids.clone()).unwrap_or_default();
                if !label_ids.contains(&id) {
                    continue;
                }
                let remaining: Vec<i64> = label_ids.into_iter().filter(|l| *l != id).collect();
                let mut active: task::ActiveModel = task_model.into();
                active.label_ids = Set(to_json(&remaining)?);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
                stripped_any = true;
            }
        }

        label::Entity::delete_by_id(id).exec(&txn).await?;

        if stripped_any {
            ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, None).await?;
        }
        ChangeLog::record(&txn, Table::Labels, ChangeOp::Delete, Some(id)).await?;
        txn.commit().await?;
        Ok(1)
    }

    /// Adds the label to a task's label set. Missing task or label is a
    /// tolerated no-op; a label from another project is rejected.
    pub async fn assign<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        label_id: i64,
    ) -> Result<(), LabelError> {
        let Some(task_model) = task::Entity::find_by_id(task_id).one(db).await? else {
            return Ok(());
        };
        let Some(label_model) = label::Entity::find_by_id(label_id).one(db).await? else {
            return Ok(());
        };

        let board_model = board::Entity::find_by_id(task_model.board_id)
            .one(db)
            .await?;
        if board_model.map(|b| b.project_id) != Some(label_model.project_id) {
            return Err(LabelError::ProjectMismatch { label_id });
        }

        let mut label_ids: Vec<i64> =
            serde_json::from_value(task_model.label_ids.clone()).unwrap_or_default();
        if label_ids.contains(&label_id) {
            return Ok(());
        }
        label_ids.push(label_id);

        let txn = db.begin().await?;
        let mut active: task::ActiveModel = task_model.into();
        active.label_ids = Set(to_json(&label_ids)?);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, Some(task_id)).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn unassign<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        label_id: i64,
    ) -> Result<(), DbErr> {
        let Some(task_model) = task::Entity::find_by_id(task_id).one(db).await? else {
            return Ok(());
        };

        let label_ids: Vec<i64> =
            serde_json::from_value(task_model.label_ids.clone()).unwrap_or_default();
        if !label_ids.contains(&label_id) {
            return Ok(());
        }
        let remaining: Vec<i64> = label_ids.into_iter().filter(|l| *l != label_id).collect();

        let txn = db.begin().await?;
        let mut active: task::ActiveModel = task_model.into();
        active.label_ids = Set(to_json(&remaining)?);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, Some(task_id)).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::Database;
    use sea_orm_migration::MigratorTrait;

    use super::*;
    use crate::models::{
        board::{Board, CreateBoard},
        board_column::BoardColumn,
        project::{CreateProject, Project},
        task::{CreateTask, Task},
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    struct Fixture {
        project: Project,
        board: Board,
        column_id: i64,
    }

    async fn make_fixture(db: &sea_orm::DatabaseConnection) -> Fixture {
        let project = Project::create(
            db,
            &CreateProject {
                name: "p".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let board = Board::create(
            db,
            &CreateBoard {
                project_id: project.id,
                name: "b".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
        let column_id = BoardColumn::find_by_board(db, board.id).await.unwrap()[0].id;
        Fixture {
            project,
            board,
            column_id,
        }
    }

    #[tokio::test]
    async fn assign_and_unassign_round_trip() {
        let db = setup_db().await;
        let fx = make_fixture(&db).await;

        let label = Label::create(
            &db,
            &CreateLabel {
                project_id: fx.project.id,
                name: "bug".to_string(),
                color: "#f00".to_string(),
            },
        )
        .await
        .unwrap();
        let task = Task::create(
            &db,
            &CreateTask {
                board_id: fx.board.id,
                column_id: fx.column_id,
                title: "t".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        Label::assign(&db, task.id, label.id).await.unwrap();
        // Repeat assignment does not duplicate the id.
        Label::assign(&db, task.id, label.id).await.unwrap();

        let reloaded = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.label_ids, vec![label.id]);

        Label::unassign(&db, task.id, label.id).await.unwrap();
        let reloaded = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert!(reloaded.label_ids.is_empty());
    }

    #[tokio::test]
    async fn assign_rejects_label_from_another_project() {
        let db = setup_db().await;
        let fx = make_fixture(&db).await;
        let other = make_fixture(&db).await;

        let foreign_label = Label::create(
            &db,
            &CreateLabel {
                project_id: other.project.id,
                name: "urgent".to_string(),
                color: "#0f0".to_string(),
            },
        )
        .await
        .unwrap();
        let task = Task::create(
            &db,
            &CreateTask {
                board_id: fx.board.id,
                column_id: fx.column_id,
                title: "t".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let err = Label::assign(&db, task.id, foreign_label.id)
            .await
            .unwrap_err();
        assert!(matches!(err, LabelError::ProjectMismatch { .. }));
    }

    #[tokio::test]
    async fn delete_strips_references_from_tasks() {
        let db = setup_db().await;
        let fx = make_fixture(&db).await;

        let keep = Label::create(
            &db,
            &CreateLabel {
                project_id: fx.project.id,
                name: "keep".to_string(),
                color: "#00f".to_string(),
            },
        )
        .await
        .unwrap();
        let doomed = Label::create(
            &db,
            &CreateLabel {
                project_id: fx.project.id,
                name: "doomed".to_string(),
                color: "#f00".to_string(),
            },
        )
        .await
        .unwrap();

        let task = Task::create(
            &db,
            &CreateTask {
                board_id: fx.board.id,
                column_id: fx.column_id,
                title: "t".to_string(),
                label_ids: vec![keep.id, doomed.id],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(Label::delete(&db, doomed.id).await.unwrap(), 1);

        let reloaded = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.label_ids, vec![keep.id]);
        assert!(Label::find_by_id(&db, doomed.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_positions_scope_to_project() {
        let db = setup_db().await;
        let fx = make_fixture(&db).await;
        let other = make_fixture(&db).await;

        let a = Label::create(
            &db,
            &CreateLabel {
                project_id: fx.project.id,
                name: "a".to_string(),
                color: "#111".to_string(),
            },
        )
        .await
        .unwrap();
        let b = Label::create(
            &db,
            &CreateLabel {
                project_id: fx.project.id,
                name: "b".to_string(),
                color: "#222".to_string(),
            },
        )
        .await
        .unwrap();
        let elsewhere = Label::create(
            &db,
            &CreateLabel {
                project_id: other.project.id,
                name: "c".to_string(),
                color: "#333".to_string(),
            },
        )
        .await
        .unwrap();

        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_eq!(elsewhere.position, 0);
    }
}
