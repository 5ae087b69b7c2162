use std::collections::HashMap;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JsonValue,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entities::{board_column, task, template},
    models::{
        activity::Activity,
        attachment::Attachment,
        cascade,
        change_log::ChangeLog,
        checklist_item::{ChecklistItem, ChecklistProgress},
        comment::Comment,
        label::Label,
        template::TaskSnapshot,
    },
    types::{ChangeOp, Priority, SortDirection, Table, TaskSortField},
};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Column not found")]
    ColumnNotFound,
    #[error("Column {column_id} does not belong to the task's board")]
    ColumnBoardMismatch { column_id: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub board_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub position: f64,
    pub assignees: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub label_ids: Vec<i64>,
    pub cover_image_id: Option<i64>,
    pub archived_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CreateTask {
    pub board_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub assignees: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub label_ids: Vec<i64>,
}

/// Partial update. Outer `None` leaves a field untouched; for nullable
/// columns `Some(None)` clears the value.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub assignees: Option<Vec<String>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub label_ids: Option<Vec<i64>>,
    pub cover_image_id: Option<Option<i64>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskFilters {
    pub board_id: Option<i64>,
    pub column_id: Option<i64>,
    pub assignee: Option<String>,
    pub priorities: Vec<Priority>,
    pub label_ids: Vec<i64>,
    pub due_after: Option<DateTime<Utc>>,
    pub due_before: Option<DateTime<Utc>>,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskWithRelations {
    pub task: Task,
    pub labels: Vec<Label>,
    pub checklist: Vec<ChecklistItem>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
    pub activities: Vec<Activity>,
    pub checklist_progress: ChecklistProgress,
}

impl Deref for TaskWithRelations {
    type Target = Task;

    fn deref(&self) -> &Task {
        &self.task
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<JsonValue, DbErr> {
    serde_json::to_value(value).map_err(|err| DbErr::Custom(err.to_string()))
}

impl Task {
    fn from_model(model: task::Model) -> Self {
        Self {
            id: model.id,
            board_id: model.board_id,
            column_id: model.column_id,
            title: model.title,
            description: model.description,
            priority: model.priority,
            position: model.position,
            assignees: serde_json::from_value(model.assignees).unwrap_or_default(),
            due_date: model.due_date,
            label_ids: serde_json::from_value(model.label_ids).unwrap_or_default(),
            cover_image_id: model.cover_image_id,
            archived_at: model.archived_at,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }

    fn active() -> sea_orm::Select<task::Entity> {
        task::Entity::find().filter(task::Column::ArchivedAt.is_null())
    }

    pub async fn find_by_board<C: ConnectionTrait>(
        db: &C,
        board_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = Self::active()
            .filter(task::Column::BoardId.eq(board_id))
            .order_by_asc(task::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_column<C: ConnectionTrait>(
        db: &C,
        column_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = Self::active()
            .filter(task::Column::ColumnId.eq(column_id))
            .order_by_asc(task::Column::Position)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = task::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from_model))
    }

    pub async fn find_archived<C: ConnectionTrait>(
        db: &C,
        board_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let records = task::Entity::find()
            .filter(task::Column::BoardId.eq(board_id))
            .filter(task::Column::ArchivedAt.is_not_null())
            .order_by_desc(task::Column::ArchivedAt)
            .all(db)
            .await?;
        Ok(records.into_iter().map(Self::from_model).collect())
    }

    /// Active task count per column for one board.
    pub async fn counts_by_column<C: ConnectionTrait>(
        db: &C,
        board_id: i64,
    ) -> Result<HashMap<i64, u64>, DbErr> {
        let column_ids: Vec<i64> = Self::active()
            .select_only()
            .column(task::Column::ColumnId)
            .filter(task::Column::BoardId.eq(board_id))
            .into_tuple()
            .all(db)
            .await?;

        let mut counts = HashMap::new();
        for column_id in column_ids {
            *counts.entry(column_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    pub async fn create<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        data: &CreateTask,
    ) -> Result<Self, DbErr> {
        let txn = db.begin().await?;

        let max_position: Option<f64> = task::Entity::find()
            .select_only()
            .column_as(task::Column::Position.max(), "max_position")
            .filter(task::Column::BoardId.eq(data.board_id))
            .filter(task::Column::ColumnId.eq(data.column_id))
            .into_tuple()
            .one(&txn)
            .await?
            .flatten();

        let now = Utc::now();
        let active = task::ActiveModel {
            board_id: Set(data.board_id),
            column_id: Set(data.column_id),
            title: Set(data.title.clone()),
            description: Set(data.description.clone()),
            priority: Set(data.priority),
            position: Set(max_position.unwrap_or(-1.0) + 1.0),
            assignees: Set(to_json(&data.assignees)?),
            due_date: Set(data.due_date),
            label_ids: Set(to_json(&data.label_ids)?),
            cover_image_id: Set(None),
            archived_at: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(model))
    }

    pub async fn update<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
        payload: &UpdateTask,
    ) -> Result<Self, TaskError> {
        let txn = db.begin().await?;

        let record = task::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(TaskError::TaskNotFound)?;

        let mut active: task::ActiveModel = record.into();
        if let Some(title) = payload.title.clone() {
            active.title = Set(title);
        }
        if let Some(description) = payload.description.clone() {
            active.description = Set(description);
        }
        if let Some(priority) = payload.priority {
            active.priority = Set(priority);
        }
        if let Some(assignees) = &payload.assignees {
            active.assignees = Set(to_json(assignees)?);
        }
        if let Some(due_date) = payload.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(label_ids) = &payload.label_ids {
            active.label_ids = Set(to_json(label_ids)?);
        }
        if let Some(cover_image_id) = payload.cover_image_id {
            active.cover_image_id = Set(cover_image_id);
        }
        if let Some(completed_at) = payload.completed_at {
            active.completed_at = Set(completed_at);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(Self::from_model(updated))
    }

    /// Moves a task into a column of the same board. A missing task is a
    /// tolerated no-op (the UI may race a delete); a cross-board column is
    /// rejected before any write happens. When `position` is given, siblings
    /// at or past it shift up by one; otherwise the task lands at the end of
    /// the column's active list.
    pub async fn move_to_column<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_id: i64,
        column_id: i64,
        position: Option<f64>,
    ) -> Result<(), TaskError> {
        let Some(record) = task::Entity::find_by_id(task_id).one(db).await? else {
            return Ok(());
        };
        let column = board_column::Entity::find_by_id(column_id)
            .one(db)
            .await?
            .ok_or(TaskError::ColumnNotFound)?;
        if column.board_id != record.board_id {
            return Err(TaskError::ColumnBoardMismatch { column_id });
        }

        let txn = db.begin().await?;

        let position = match position {
            Some(position) => {
                task::Entity::update_many()
                    .col_expr(
                        task::Column::Position,
                        Expr::col(task::Column::Position).add(1.0),
                    )
                    .filter(task::Column::ColumnId.eq(column_id))
                    .filter(task::Column::Position.gte(position))
                    .filter(task::Column::Id.ne(task_id))
                    .exec(&txn)
                    .await?;
                position
            }
            None => {
                let max_position: Option<f64> = Self::active()
                    .select_only()
                    .column_as(task::Column::Position.max(), "max_position")
                    .filter(task::Column::ColumnId.eq(column_id))
                    .into_tuple()
                    .one(&txn)
                    .await?
                    .flatten();
                max_position.unwrap_or(-1.0) + 1.0
            }
        };

        let mut active: task::ActiveModel = record.into();
        active.column_id = Set(column_id);
        active.position = Set(position);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, Some(task_id)).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn archive<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<(), DbErr> {
        let Some(record) = task::Entity::find_by_id(id).one(db).await? else {
            return Ok(());
        };

        let txn = db.begin().await?;
        let now = Utc::now();
        let mut active: task::ActiveModel = record.into();
        active.archived_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn restore<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<(), DbErr> {
        let Some(record) = task::Entity::find_by_id(id).one(db).await? else {
            return Ok(());
        };

        let txn = db.begin().await?;
        let mut active: task::ActiveModel = record.into();
        active.archived_at = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, Some(id)).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Copies a task in place. The copy lands half a position after the
    /// original so it sits strictly between the original and its next
    /// sibling. Archive and completion state do not carry over. Returns the
    /// new id, or `None` when the source disappeared.
    pub async fn duplicate<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<i64>, DbErr> {
        let Some(record) = task::Entity::find_by_id(id).one(db).await? else {
            return Ok(None);
        };

        let txn = db.begin().await?;
        let now = Utc::now();
        let active = task::ActiveModel {
            board_id: Set(record.board_id),
            column_id: Set(record.column_id),
            title: Set(format!("{} (copy)", record.title)),
            description: Set(record.description.clone()),
            priority: Set(record.priority),
            position: Set(record.position + 0.5),
            assignees: Set(record.assignees.clone()),
            due_date: Set(record.due_date),
            label_ids: Set(record.label_ids.clone()),
            cover_image_id: Set(record.cover_image_id),
            archived_at: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Insert, Some(model.id)).await?;
        txn.commit().await?;
        Ok(Some(model.id))
    }

    pub async fn delete<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        id: i64,
    ) -> Result<u64, DbErr> {
        let txn = db.begin().await?;

        let exists = task::Entity::find_by_id(id).one(&txn).await?.is_some();
        if !exists {
            txn.commit().await?;
            return Ok(0);
        }

        cascade::delete_tasks_with_children(&txn, &[id]).await?;
        txn.commit().await?;
        Ok(1)
    }

    /// Appends the given tasks to the target column in input order. Positions
    /// continue from the column's total row count, archived rows included.
    pub async fn bulk_move<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_ids: &[i64],
        column_id: i64,
    ) -> Result<(), TaskError> {
        if task_ids.is_empty() {
            return Ok(());
        }
        let column = board_column::Entity::find_by_id(column_id)
            .one(db)
            .await?
            .ok_or(TaskError::ColumnNotFound)?;

        let records = task::Entity::find()
            .filter(task::Column::Id.is_in(task_ids.to_vec()))
            .all(db)
            .await?;
        for record in &records {
            if record.board_id != column.board_id {
                return Err(TaskError::ColumnBoardMismatch { column_id });
            }
        }

        let txn = db.begin().await?;

        let base = task::Entity::find()
            .filter(task::Column::ColumnId.eq(column_id))
            .count(&txn)
            .await? as f64;

        let mut by_id: HashMap<i64, task::Model> =
            records.into_iter().map(|m| (m.id, m)).collect();
        let now = Utc::now();
        for (index, task_id) in task_ids.iter().enumerate() {
            let Some(record) = by_id.remove(task_id) else {
                continue;
            };
            let mut active: task::ActiveModel = record.into();
            active.column_id = Set(column_id);
            active.position = Set(base + index as f64);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, None).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn bulk_archive<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_ids: &[i64],
    ) -> Result<(), DbErr> {
        if task_ids.is_empty() {
            return Ok(());
        }
        let txn = db.begin().await?;
        let now = Utc::now();
        task::Entity::update_many()
            .col_expr(task::Column::ArchivedAt, Expr::value(now))
            .col_expr(task::Column::UpdatedAt, Expr::value(now))
            .filter(task::Column::Id.is_in(task_ids.to_vec()))
            .exec(&txn)
            .await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, None).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Replaces the label set on every given task.
    pub async fn bulk_update_labels<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_ids: &[i64],
        label_ids: &[i64],
    ) -> Result<(), DbErr> {
        if task_ids.is_empty() {
            return Ok(());
        }
        let txn = db.begin().await?;
        task::Entity::update_many()
            .col_expr(task::Column::LabelIds, Expr::value(to_json(&label_ids)?))
            .col_expr(task::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(task::Column::Id.is_in(task_ids.to_vec()))
            .exec(&txn)
            .await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, None).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Replaces the assignee list on every given task.
    pub async fn bulk_update_assignees<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        task_ids: &[i64],
        assignees: &[String],
    ) -> Result<(), DbErr> {
        if task_ids.is_empty() {
            return Ok(());
        }
        let txn = db.begin().await?;
        task::Entity::update_many()
            .col_expr(task::Column::Assignees, Expr::value(to_json(&assignees)?))
            .col_expr(task::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(task::Column::Id.is_in(task_ids.to_vec()))
            .exec(&txn)
            .await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Update, None).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Instantiates a template at the end of the target column and bumps the
    /// template's usage counter in the same transaction. Returns the new task
    /// id, or `None` when the template is gone.
    pub async fn create_from_template<C: ConnectionTrait + TransactionTrait>(
        db: &C,
        template_id: i64,
        board_id: i64,
        column_id: i64,
    ) -> Result<Option<i64>, DbErr> {
        let Some(tpl) = template::Entity::find_by_id(template_id).one(db).await? else {
            return Ok(None);
        };
        let snapshot: TaskSnapshot =
            serde_json::from_value(tpl.task_data.clone()).unwrap_or_default();

        let txn = db.begin().await?;

        let max_position: Option<f64> = task::Entity::find()
            .select_only()
            .column_as(task::Column::Position.max(), "max_position")
            .filter(task::Column::ColumnId.eq(column_id))
            .into_tuple()
            .one(&txn)
            .await?
            .flatten();

        let now = Utc::now();
        let active = task::ActiveModel {
            board_id: Set(board_id),
            column_id: Set(column_id),
            title: Set(snapshot.title),
            description: Set(snapshot.description),
            priority: Set(snapshot.priority),
            position: Set(max_position.unwrap_or(-1.0) + 1.0),
            assignees: Set(to_json(&snapshot.assignees)?),
            due_date: Set(snapshot.due_date),
            label_ids: Set(to_json(&snapshot.label_ids)?),
            cover_image_id: Set(snapshot.cover_image_id),
            archived_at: Set(None),
            completed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(&txn).await?;

        let usage_count = tpl.usage_count;
        let mut tpl_active: template::ActiveModel = tpl.into();
        tpl_active.usage_count = Set(usage_count + 1);
        tpl_active.updated_at = Set(now);
        tpl_active.update(&txn).await?;

        ChangeLog::record(&txn, Table::Tasks, ChangeOp::Insert, Some(model.id)).await?;
        ChangeLog::record(&txn, Table::Templates, ChangeOp::Update, Some(template_id)).await?;
        txn.commit().await?;
        Ok(Some(model.id))
    }

    /// Filtered search over active tasks. Column-level filters run in SQL;
    /// the JSON list filters and the free-text query run over the fetched
    /// rows.
    pub async fn search<C: ConnectionTrait>(
        db: &C,
        filters: &TaskFilters,
    ) -> Result<Vec<Self>, DbErr> {
        let mut select = Self::active();
        if let Some(board_id) = filters.board_id {
            select = select.filter(task::Column::BoardId.eq(board_id));
        }
        if let Some(column_id) = filters.column_id {
            select = select.filter(task::Column::ColumnId.eq(column_id));
        }
        if !filters.priorities.is_empty() {
            select = select.filter(task::Column::Priority.is_in(filters.priorities.clone()));
        }
        if let Some(due_after) = filters.due_after {
            select = select.filter(task::Column::DueDate.gte(due_after));
        }
        if let Some(due_before) = filters.due_before {
            select = select.filter(task::Column::DueDate.lte(due_before));
        }

        let records = select.order_by_asc(task::Column::Position).all(db).await?;
        let mut tasks: Vec<Self> = records.into_iter().map(Self::from_model).collect();

        if let Some(assignee) = &filters.assignee {
            tasks.retain(|t| t.assignees.iter().any(|a| a == assignee));
        }
        if !filters.label_ids.is_empty() {
            tasks.retain(|t| filters.label_ids.iter().all(|id| t.label_ids.contains(id)));
        }
        if let Some(query) = &filters.query {
            let needle = query.to_lowercase();
            tasks.retain(|t| {
                t.title.to_lowercase().contains(&needle)
                    || t.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
                    || t.assignees.iter().any(|a| a.to_lowercase().contains(&needle))
            });
        }

        Ok(tasks)
    }

    pub async fn with_relations<C: ConnectionTrait>(
        db: &C,
        id: i64,
    ) -> Result<Option<TaskWithRelations>, DbErr> {
        let Some(task) = Self::find_by_id(db, id).await? else {
            return Ok(None);
        };

        let labels = Label::find_by_ids(db, &task.label_ids).await?;
        let checklist = ChecklistItem::find_by_task(db, id).await?;
        let comments = Comment::find_by_task(db, id).await?;
        let attachments = Attachment::find_by_task(db, id).await?;
        let activities = Activity::find_by_task(db, id).await?;
        let checklist_progress = crate::models::checklist_item::checklist_progress(&checklist);

        Ok(Some(TaskWithRelations {
            task,
            labels,
            checklist,
            comments,
            attachments,
            activities,
            checklist_progress,
        }))
    }
}

/// In-memory ordering used by list views. Missing due dates always sort last,
/// whichever direction is asked for; everything else flips with the
/// direction.
pub fn sort_tasks(tasks: &[Task], field: TaskSortField, direction: SortDirection) -> Vec<Task> {
    use std::cmp::Ordering;

    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| {
        let ordering = match field {
            TaskSortField::Priority => a.priority.rank().cmp(&b.priority.rank()),
            TaskSortField::DueDate => {
                return match (a.due_date, b.due_date) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Greater,
                    (Some(_), None) => Ordering::Less,
                    (Some(a), Some(b)) => match direction {
                        SortDirection::Asc => a.cmp(&b),
                        SortDirection::Desc => b.cmp(&a),
                    },
                };
            }
            TaskSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            TaskSortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            TaskSortField::Position => a.position.total_cmp(&b.position),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
    sorted
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
    };

    async fn setup_db() -> sea_orm::DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    struct Fixture {
        board: Board,
        columns: Vec<BoardColumn>,
    }

    async fn make_board(db: &sea_orm::DatabaseConnection) -> Fixture {
        let project = Project::create(
            db,
            &CreateProject {
                name: "P1".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let board = Board::create(
            db,
            &CreateBoard {
                project_id: project.id,
                name: "B1".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();
        let columns = BoardColumn::find_by_board(db, board.id).await.unwrap();
        Fixture { board, columns }
    }

    async fn make_task(db: &sea_orm::DatabaseConnection, fx: &Fixture, title: &str) -> Task {
        Task::create(
            db,
            &CreateTask {
                board_id: fx.board.id,
                column_id: fx.columns[0].id,
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_move_and_verify_board_state() {
        let db = setup_db().await;
        let fx = make_board(&db).await;

        let task = make_task(&db, &fx, "T1").await;
        assert_eq!(task.position, 0.0);
        assert_eq!(task.priority, Priority::Medium);

        Task::move_to_column(&db, task.id, fx.columns[1].id, None)
            .await
            .unwrap();

        let in_progress = Task::find_by_column(&db, fx.columns[1].id).await.unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].title, "T1");
        assert!(Task::find_by_column(&db, fx.columns[0].id)
            .await
            .unwrap()
            .is_empty());

        let counts = Task::counts_by_column(&db, fx.board.id).await.unwrap();
        assert_eq!(counts.get(&fx.columns[1].id), Some(&1));
    }

    #[tokio::test]
    async fn move_to_front_shifts_siblings() {
        let db = setup_db().await;
        let fx = make_board(&db).await;

        let a = make_task(&db, &fx, "A").await;
        let b = make_task(&db, &fx, "B").await;
        let c = make_task(&db, &fx, "C").await;

        Task::move_to_column(&db, c.id, fx.columns[0].id, Some(0.0))
            .await
            .unwrap();

        let tasks = Task::find_by_column(&db, fx.columns[0].id).await.unwrap();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        assert_eq!(tasks[0].position, 0.0);
        assert_eq!(tasks[1].id, a.id);
        assert_eq!(tasks[1].position, 1.0);
        assert_eq!(tasks[2].id, b.id);
        assert_eq!(tasks[2].position, 2.0);
    }

    #[tokio::test]
    async fn move_of_missing_task_is_a_no_op() {
        let db = setup_db().await;
        let fx = make_board(&db).await;
        Task::move_to_column(&db, 999, fx.columns[0].id, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn move_rejects_column_of_another_board() {
        let db = setup_db().await;
        let fx = make_board(&db).await;
        let other = make_board(&db).await;
        let task = make_task(&db, &fx, "T").await;

        let err = Task::move_to_column(&db, task.id, other.columns[0].id, None)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::ColumnBoardMismatch { .. }));

        // Nothing moved.
        let reloaded = Task::find_by_id(&db, task.id).await.unwrap().unwrap();
        assert_eq!(reloaded.column_id, fx.columns[0].id);
    }

    #[tokio::test]
    async fn duplicate_lands_between_siblings() {
        let db = setup_db().await;
        let fx = make_board(&db).await;

        let a = make_task(&db, &fx, "A").await;
        make_task(&db, &fx, "B").await;

        let copy_id = Task::duplicate(&db, a.id).await.unwrap().unwrap();
        let copy = Task::find_by_id(&db, copy_id).await.unwrap().unwrap();
        assert_eq!(copy.title, "A (copy)");
        assert_eq!(copy.position, 0.5);

        let tasks = Task::find_by_column(&db, fx.columns[0].id).await.unwrap();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "A (copy)", "B"]);
    }

    #[tokio::test]
    async fn duplicate_clears_archive_and_completion_state() {
        let db = setup_db().await;
        let fx = make_board(&db).await;
        let task = make_task(&db, &fx, "T").await;

        Task::update(
            &db,
            task.id,
            &UpdateTask {
                completed_at: Some(Some(Utc::now())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Task::archive(&db, task.id).await.unwrap();

        let copy_id = Task::duplicate(&db, task.id).await.unwrap().unwrap();
        let copy = Task::find_by_id(&db, copy_id).await.unwrap().unwrap();
        assert!(copy.archived_at.is_none());
        assert!(copy.completed_at.is_none());
    }

    #[tokio::test]
    async fn duplicate_of_missing_task_returns_none() {
        let db = setup_db().await;
        assert_eq!(Task::duplicate(&db, 42).await.unwrap(), None);
    }

    #[tokio::test]
    async fn archive_hides_and_restore_brings_back() {
        let db = setup_db().await;
        let fx = make_board(&db).await;
        let task = make_task(&db, &fx, "T").await;

        Task::archive(&db, task.id).await.unwrap();
        assert!(Task::find_by_board(&db, fx.board.id).await.unwrap().is_empty());
        let archived = Task::find_archived(&db, fx.board.id).await.unwrap();
        assert_eq!(archived.len(), 1);

        Task::restore(&db, task.id).await.unwrap();
        let active = Task::find_by_board(&db, fx.board.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert!(active[0].archived_at.is_none());

        // Archiving a missing task is tolerated.
        Task::archive(&db, 999).await.unwrap();
    }

    #[tokio::test]
    async fn bulk_move_appends_in_input_order() {
        let db = setup_db().await;
        let fx = make_board(&db).await;

        let a = make_task(&db, &fx, "A").await;
        let b = make_task(&db, &fx, "B").await;
        let target = fx.columns[1].id;
        let existing = Task::create(
            &db,
            &CreateTask {
                board_id: fx.board.id,
                column_id: target,
                title: "existing".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(existing.position, 0.0);

        Task::bulk_move(&db, &[b.id, a.id], target).await.unwrap();

        let tasks = Task::find_by_column(&db, target).await.unwrap();
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["existing", "B", "A"]);
        assert_eq!(tasks[1].position, 1.0);
        assert_eq!(tasks[2].position, 2.0);
    }

    #[tokio::test]
    async fn bulk_archive_and_bulk_label_update() {
        let db = setup_db().await;
        let fx = make_board(&db).await;

        let a = make_task(&db, &fx, "A").await;
        let b = make_task(&db, &fx, "B").await;
        let c = make_task(&db, &fx, "C").await;

        Task::bulk_update_labels(&db, &[a.id, b.id], &[7, 9]).await.unwrap();
        let a_reloaded = Task::find_by_id(&db, a.id).await.unwrap().unwrap();
        assert_eq!(a_reloaded.label_ids, vec![7, 9]);
        let c_reloaded = Task::find_by_id(&db, c.id).await.unwrap().unwrap();
        assert!(c_reloaded.label_ids.is_empty());

        Task::bulk_archive(&db, &[a.id, b.id]).await.unwrap();
        let active = Task::find_by_board(&db, fx.board.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, c.id);
    }

    #[tokio::test]
    async fn delete_removes_children() {
        let db = setup_db().await;
        let fx = make_board(&db).await;
        let task = make_task(&db, &fx, "T").await;

        ChecklistItem::add(&db, task.id, "step").await.unwrap();
        Comment::add(&db, task.id, "alice", None, "hi").await.unwrap();

        assert_eq!(Task::delete(&db, task.id).await.unwrap(), 1);
        assert!(ChecklistItem::find_by_task(&db, task.id).await.unwrap().is_empty());
        assert!(Comment::find_by_task(&db, task.id).await.unwrap().is_empty());
        assert_eq!(Task::delete(&db, task.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn search_combines_filters() {
        let db = setup_db().await;
        let fx = make_board(&db).await;

        Task::create(
            &db,
            &CreateTask {
                board_id: fx.board.id,
                column_id: fx.columns[0].id,
                title: "Write release notes".to_string(),
                priority: Priority::High,
                assignees: vec!["alice".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        Task::create(
            &db,
            &CreateTask {
                board_id: fx.board.id,
                column_id: fx.columns[0].id,
                title: "Fix login bug".to_string(),
                priority: Priority::Low,
                assignees: vec!["bob".to_string()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let found = Task::search(
            &db,
            &TaskFilters {
                board_id: Some(fx.board.id),
                priorities: vec![Priority::High],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Write release notes");

        let found = Task::search(
            &db,
            &TaskFilters {
                assignee: Some("bob".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Fix login bug");

        let found = Task::search(
            &db,
            &TaskFilters {
                query: Some("LOGIN".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(found.len(), 1);
    }

    fn bare_task(title: &str, due: Option<DateTime<Utc>>, priority: Priority) -> Task {
        let now = Utc::now();
        Task {
            id: 0,
            board_id: 0,
            column_id: 0,
            title: title.to_string(),
            description: None,
            priority,
            position: 0.0,
            assignees: Vec::new(),
            due_date: due,
            label_ids: Vec::new(),
            cover_image_id: None,
            archived_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn sort_keeps_missing_due_dates_last_in_both_directions() {
        use chrono::TimeZone;

        let early = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let tasks = vec![
            bare_task("none", None, Priority::Medium),
            bare_task("late", Some(late), Priority::Medium),
            bare_task("early", Some(early), Priority::Medium),
        ];

        let asc = sort_tasks(&tasks, TaskSortField::DueDate, SortDirection::Asc);
        let titles: Vec<_> = asc.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "late", "none"]);

        let desc = sort_tasks(&tasks, TaskSortField::DueDate, SortDirection::Desc);
        let titles: Vec<_> = desc.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["late", "early", "none"]);
    }

    #[test]
    fn sort_by_priority_uses_rank() {
        let tasks = vec![
            bare_task("low", None, Priority::Low),
            bare_task("urgent", None, Priority::Urgent),
            bare_task("medium", None, Priority::Medium),
        ];

        let asc = sort_tasks(&tasks, TaskSortField::Priority, SortDirection::Asc);
        let titles: Vec<_> = asc.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["urgent", "medium", "low"]);

        let desc = sort_tasks(&tasks, TaskSortField::Priority, SortDirection::Desc);
        let titles: Vec<_> = desc.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["low", "medium", "urgent"]);
    }
}
