use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};

use crate::entities::{activity, attachment, board, board_column, checklist_item, comment, label, task};
use crate::models::change_log::ChangeLog;
use crate::types::{ChangeOp, ScopeKind, Table};

/// Cascade deletes for the parent/child tree. Callers are expected to pass a
/// transaction; each helper deletes children before parents so a failure
/// never strands orphans past a rollback.

pub async fn delete_task_children<C: ConnectionTrait>(
    db: &C,
    task_ids: &[i64],
) -> Result<(), DbErr> {
    if task_ids.is_empty() {
        return Ok(());
    }

    let res = checklist_item::Entity::delete_many()
        .filter(checklist_item::Column::TaskId.is_in(task_ids.to_vec()))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        ChangeLog::record(db, Table::ChecklistItems, ChangeOp::Delete, None).await?;
    }

    let res = comment::Entity::delete_many()
        .filter(comment::Column::TaskId.is_in(task_ids.to_vec()))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        ChangeLog::record(db, Table::Comments, ChangeOp::Delete, None).await?;
    }

    let res = attachment::Entity::delete_many()
        .filter(attachment::Column::TaskId.is_in(task_ids.to_vec()))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        ChangeLog::record(db, Table::Attachments, ChangeOp::Delete, None).await?;
    }

    let res = activity::Entity::delete_many()
        .filter(activity::Column::ScopeKind.eq(ScopeKind::Task))
        .filter(activity::Column::ScopeId.is_in(task_ids.to_vec()))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        ChangeLog::record(db, Table::Activities, ChangeOp::Delete, None).await?;
    }

    Ok(())
}

pub async fn delete_tasks_with_children<C: ConnectionTrait>(
    db: &C,
    task_ids: &[i64],
) -> Result<(), DbErr> {
    if task_ids.is_empty() {
        return Ok(());
    }

    delete_task_children(db, task_ids).await?;

    let res = task::Entity::delete_many()
        .filter(task::Column::Id.is_in(task_ids.to_vec()))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        ChangeLog::record(db, Table::Tasks, ChangeOp::Delete, None).await?;
    }

    Ok(())
}

pub async fn delete_column_contents<C: ConnectionTrait>(
    db: &C,
    column_id: i64,
) -> Result<(), DbErr> {
    let task_ids: Vec<i64> = task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::ColumnId.eq(column_id))
        .into_tuple()
        .all(db)
        .await?;
    delete_tasks_with_children(db, &task_ids).await
}

pub async fn delete_board_contents<C: ConnectionTrait>(
    db: &C,
    board_id: i64,
) -> Result<(), DbErr> {
    let task_ids: Vec<i64> = task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::BoardId.eq(board_id))
        .into_tuple()
        .all(db)
        .await?;
    delete_tasks_with_children(db, &task_ids).await?;

    let res = board_column::Entity::delete_many()
        .filter(board_column::Column::BoardId.eq(board_id))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        ChangeLog::record(db, Table::Columns, ChangeOp::Delete, None).await?;
    }

    Ok(())
}

pub async fn delete_project_contents<C: ConnectionTrait>(
    db: &C,
    project_id: i64,
) -> Result<(), DbErr> {
    let board_ids: Vec<i64> = board::Entity::find()
        .select_only()
        .column(board::Column::Id)
        .filter(board::Column::ProjectId.eq(project_id))
        .into_tuple()
        .all(db)
        .await?;

    for board_id in &board_ids {
        delete_board_contents(db, *board_id).await?;
    }

    if !board_ids.is_empty() {
        let res = board::Entity::delete_many()
            .filter(board::Column::Id.is_in(board_ids))
            .exec(db)
            .await?;
        if res.rows_affected > 0 {
            ChangeLog::record(db, Table::Boards, ChangeOp::Delete, None).await?;
        }
    }

    let res = label::Entity::delete_many()
        .filter(label::Column::ProjectId.eq(project_id))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        ChangeLog::record(db, Table::Labels, ChangeOp::Delete, None).await?;
    }

    Ok(())
}
