use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::project,
    models::{cascade, change_log::ChangeLog},
    types::{ChangeOp, Table},
};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Project not found")]
    ProjectNotFound,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub starred: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateProject {
    pub name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

impl Project {
    fn from_model(model: project::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            icon: model.icon,
            description: model.description,
            color: model.color,
            starred: model.starred,
            position: model.position,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_all<C: ConnectionTrait>(db: &C) -> Result<Vec<Self>, DbErr> {
        let records = project::Entity::find()
            .order_by_asc(project::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = project::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateProject,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let max_position: Option<i64> = project::Entity::find()
            .select_only()
            .column_as(project::Column::Position.max(), "max_position")
            .into_tuple()
            .one(&txn)
            .await?
            .flatten();

        let now = Utc::now();
        let active = project::ActiveModel {
            name: Set(data.name.clone()),
            icon: Set(data.icon.clone()),
            description: Set(data.description.clone()),
            color: Set(data.color.clone()),
            starred: Set(false),
            position: Set(max_position.unwrap_or(-1) + 1),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Projects, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateProject,
    ) -> Result<Self, ProjectError> {
        let txn = db.begin().await?;

        let record = project::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;

        let mut active: project::ActiveModel = record.into();
        if let Some(name) = payload.name.clone() {
            active.name = Set(name);
        }
        if payload.icon.is_some() {
            active.icon = Set(payload.icon.clone());
        }
        if payload.description.is_some() {
            active.description = Set(payload.description.clone());
        }
        if payload.color.is_some() {
            active.color = Set(payload.color.clone());
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Projects, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(updated))
    }

    pub async fn toggle_star<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<bool, ProjectError> {
        let txn = db.begin().await?;

        let record = project::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(ProjectError::ProjectNotFound)?;

        let starred = !record.starred;
        let mut active: project::ActiveModel = record.into();
        active.starred = Set(starred);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Projects, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(starred)
    }

    /// Rewrite positions so they match the order of `ordered_ids`. Ids not
    /// present in the list keep their old positions.
    pub async fn reorder<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        ordered_ids: &[i64],
    ) -> Result<(), DbErr> {
        let txn = db.begin().await?;

        for (index, id) in ordered_ids.iter().enumerate() {
            project::Entity::update_many()
                .col_expr(
                    project::Column::Position,
                    sea_orm::sea_query::Expr::value(index as i64),
                )
                .col_expr(
                    project::Column::UpdatedAt,
                    sea_orm::sea_query::Expr::value(Utc::now()),
                )
                .filter(project::Column::Id.eq(*id))
                .exec(&txn)
                .await?;
        }

        if !ordered_ids.is_empty() {
            ChangeLog::record(&txn, Table::Projects, ChangeOp::Update, None).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    /// Deletes the project together with every board, column, task, task
    /// child and label under it, all in one transaction.
    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;

        cascade::delete_project_contents(&txn, id).await?;

        let result = project::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::Projects, ChangeOp::Delete, Some(id)).await?;
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
        entities::{activity, attachment, board, board_column, checklist_item, comment, label, task},
        models::{
            board::{Board, CreateBoard},
            checklist_item::ChecklistItem,
            comment::Comment,
            label::{CreateLabel, Label},
            task::{CreateTask, Task},
        },
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn create_assigns_increasing_positions() {
        let db = setup_db().await;

        let first = Project::create(
            &db,
            &CreateProject {
                name: "Editorial".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let second = Project::create(
            &db,
            &CreateProject {
                name: "Marketing".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert!(!first.starred);

        let all = Project::find_all(&db).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Editorial");
    }

    #[tokio::test]
    async fn reorder_rewrites_positions() {
        let db = setup_db().await;

        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let created = Project::create(
                &db,
                &CreateProject {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
            ids.push(created.id);
        }

        Project::reorder(&db, &[ids[2], ids[0], ids[1]]).await.unwrap();

        let all = Project::find_all(&db).await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn toggle_star_flips_flag() {
        let db = setup_db().await;
        let created = Project::create(
            &db,
            &CreateProject {
                name: "p".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(Project::toggle_star(&db, created.id).await.unwrap());
        assert!(!Project::toggle_star(&db, created.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_cascades_through_the_whole_tree() {
        let db = setup_db().await;

        let project = Project::create(
            &db,
            &CreateProject {
                name: "p".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let board = Board::create(
            &db,
            &CreateBoard {
                project_id: project.id,
                name: "b".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

        let columns = crate::models::board_column::BoardColumn::find_by_board(&db, board.id)
            .await
            .unwrap();
        assert_eq!(columns.len(), 3);

        let label = Label::create(
            &db,
            &CreateLabel {
                project_id: project.id,
                name: "bug".to_string(),
                color: "#ff0000".to_string(),
            },
        )
        .await
        .unwrap();

        let task_id = Task::create(
            &db,
            &CreateTask {
                board_id: board.id,
                column_id: columns[0].id,
                title: "t".to_string(),
                label_ids: vec![label.id],
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id;

        ChecklistItem::add(&db, task_id, "step one").await.unwrap();
        Comment::add(&db, task_id, "alice", None, "hello").await.unwrap();

        let deleted = Project::delete(&db, project.id).await.unwrap();
        assert_eq!(deleted, 1);

        assert!(board::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(board_column::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(task::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(label::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(checklist_item::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(comment::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(attachment::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(
            activity::Entity::find()
                .filter(activity::Column::ScopeKind.eq(crate::types::ScopeKind::Task))
                .all(&db)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn delete_missing_project_is_a_no_op() {
        let db = setup_db().await;
        assert_eq!(Project::delete(&db, 999).await.unwrap(), 0);
    }
}
