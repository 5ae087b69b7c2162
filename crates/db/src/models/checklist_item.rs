use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};

use crate::{
    entities::checklist_item,
    models::change_log::ChangeLog,
    types::{ChangeOp, Table},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: i64,
    pub task_id: i64,
    pub text: String,
    pub completed: bool,
    pub position: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChecklistProgress {
    pub done: usize,
    pub total: usize,
}

pub fn checklist_progress(items: &[ChecklistItem]) -> ChecklistProgress {
    ChecklistProgress {
        done: items.iter().filter(|item| item.completed).count(),
        total: items.len(),
    }
}

impl ChecklistItem {
    fn from_model(model: checklist_item::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            text: model.text,
            completed: model.completed,
            position: model.position,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    pub async fn find_by_task<C: ConnectionTrait>(
        db: &C,
        task_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = checklist_item::Entity::find()
            .filter(checklist_item::Column::TaskId.eq(task_id))
            .order_by_asc(checklist_item::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn add<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        text: &str,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let max_position: Option<i64> = checklist_item::Entity::find()
            .select_only()
            .column_as(checklist_item::Column::Position.max(), "max_position")
            .filter(checklist_item::Column::TaskId.eq(task_id))
            .into_tuple()
            .one(&txn)
            .await?
            .flatten();

        let now = Utc::now();
        let active = checklist_item::ActiveModel {
            task_id: Set(task_id),
            text: Set(text.to_string()),
            completed: Set(false),
            position: Set(max_position.unwrap_or(-1) + 1),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::ChecklistItems, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn update_text<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        text: &str,
    ) -> Result<(), DbErr> {
        let Some(record) = checklist_item::Entity::find_by_id(id).one(db).await? else {
            return Ok(());
        };

        let txn = db.begin().await?;
        let mut active: checklist_item::ActiveModel = record.into();
        active.text = Set(text.to_string());
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::ChecklistItems, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Flips completion and stamps/clears `completed_at` with it.
    pub async fn toggle<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<bool>, DbErr> {
        let Some(record) = checklist_item::Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };

        let txn = db.begin().await?;
        let now = Utc::now();
        let completed = !record.completed;
        let mut active: checklist_item::ActiveModel = record.into();
        active.completed = Set(completed);
        active.completed_at = Set(completed.then_some(now));
        active.updated_at = Set(now);
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::ChecklistItems, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(Some(completed))
    }

    pub async fn reorder<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        ordered_ids: &[i64],
    ) -> Result<(), DbErr> {
        let txn = db.begin().await?;

        for (index, id) in ordered_ids.iter().enumerate() {
            checklist_item::Entity::update_many()
                .col_expr(
                    checklist_item::Column::Position,
                    sea_orm::sea_query::Expr::value(index as i64),
                )
                .col_expr(
                    checklist_item::Column::UpdatedAt,
                    sea_orm::sea_query::Expr::value(Utc::now()),
                )
                .filter(checklist_item::Column::Id.eq(*id))
                .exec(&txn)
                .await?;
        }

        if !ordered_ids.is_empty() {
            ChangeLog::record(&txn, Table::ChecklistItems, ChangeOp::Update, None).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;
        let result = checklist_item::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected > 0 {
            ChangeLog::record(&txn, Table::ChecklistItems, ChangeOp::Delete, Some(id)).await?;
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

    async fn make_task(db: &sea_orm::DatabaseConnection) -> Task {
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
        Task::create(
            db,
            &CreateTask {
                board_id: board.id,
                column_id,
                title: "t".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn add_toggle_and_progress() {
        let db = setup_db().await;
        let task = make_task(&db).await;

        let first = ChecklistItem::add(&db, task.id, "write draft").await.unwrap();
        let second = ChecklistItem::add(&db, task.id, "review").await.unwrap();
        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);

        let completed = ChecklistItem::toggle(&db, first.id).await.unwrap();
        assert_eq!(completed, Some(true));

        let items = ChecklistItem::find_by_task(&db, task.id).await.unwrap();
        assert!(items[0].completed);
        assert!(items[0].completed_at.is_some());
        assert_eq!(checklist_progress(&items), ChecklistProgress { done: 1, total: 2 });

        let completed = ChecklistItem::toggle(&db, first.id).await.unwrap();
        assert_eq!(completed, Some(false));
        let items = ChecklistItem::find_by_task(&db, task.id).await.unwrap();
        assert!(items[0].completed_at.is_none());

        assert_eq!(ChecklistItem::toggle(&db, 999).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reorder_and_delete() {
        let db = setup_db().await;
        let task = make_task(&db).await;

        let a = ChecklistItem::add(&db, task.id, "a").await.unwrap();
        let b = ChecklistItem::add(&db, task.id, "b").await.unwrap();
        let c = ChecklistItem::add(&db, task.id, "c").await.unwrap();

        ChecklistItem::reorder(&db, &[c.id, a.id, b.id]).await.unwrap();
        let items = ChecklistItem::find_by_task(&db, task.id).await.unwrap();
        let texts: Vec<_> = items.iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["c", "a", "b"]);

        assert_eq!(ChecklistItem::delete(&db, b.id).await.unwrap(), 1);
        assert_eq!(ChecklistItem::delete(&db, b.id).await.unwrap(), 0);
        assert_eq!(
            ChecklistItem::find_by_task(&db, task.id).await.unwrap().len(),
            2
        );
    }
}
