use sea_orm::{DbErr, TransactionTrait};

use crate::{
    DBService,
    models::{
        board::{Board, CreateBoard},
        board_column::BoardColumn,
        label::{CreateLabel, Label},
        project::{CreateProject, Project},
        setting::Setting,
        task::{CreateTask, Task},
    },
    types::Priority,
};

const SEEDED_KEY: &str = "seeded";

/// First-run bootstrap data. The sentinel is checked inside the transaction,
/// so concurrent callers and re-runs both settle on a single seed pass.
pub async fn seed_database(db: &DBService) -> Result<(), DbErr> {
    let txn = db.conn.begin().await?;

    if Setting::get(&txn, SEEDED_KEY).await?.is_some() {
        txn.commit().await?;
        return Ok(());
    }

    let projects = [
        ("Editorial Calendar", "📝", "#8b5cf6"),
        ("Product Launch", "🚀", "#06b6d4"),
        ("Website Redesign", "🎨", "#f59e0b"),
    ];

    for (name, icon, color) in projects {
        let project = Project::create(
            &txn,
            &CreateProject {
                name: name.to_string(),
                icon: Some(icon.to_string()),
                description: None,
                color: Some(color.to_string()),
            },
        )
        .await?;

        let board = Board::create(
            &txn,
            &CreateBoard {
                project_id: project.id,
                name: format!("{name} Board"),
                description: None,
            },
        )
        .await?;

        if name != "Editorial Calendar" {
            continue;
        }

        let needs_review = Label::create(
            &txn,
            &CreateLabel {
                project_id: project.id,
                name: "Needs review".to_string(),
                color: "#ef4444".to_string(),
            },
        )
        .await?;
        Label::create(
            &txn,
            &CreateLabel {
                project_id: project.id,
                name: "Evergreen".to_string(),
                color: "#22c55e".to_string(),
            },
        )
        .await?;

        let columns = BoardColumn::find_by_board(&txn, board.id).await?;
        Task::create(
            &txn,
            &CreateTask {
                board_id: board.id,
                column_id: columns[0].id,
                title: "Draft May newsletter".to_string(),
                priority: Priority::High,
                assignees: vec!["alice".to_string()],
                label_ids: vec![needs_review.id],
                ..Default::default()
            },
        )
        .await?;
        Task::create(
            &txn,
            &CreateTask {
                board_id: board.id,
                column_id: columns[0].id,
                title: "Collect topic pitches".to_string(),
                ..Default::default()
            },
        )
        .await?;
        Task::create(
            &txn,
            &CreateTask {
                board_id: board.id,
                column_id: columns[1].id,
                title: "Edit feature article".to_string(),
                priority: Priority::Urgent,
                assignees: vec!["bob".to_string()],
                ..Default::default()
            },
        )
        .await?;
    }

    Setting::put(&txn, SEEDED_KEY, "true").await?;
    txn.commit().await?;

    tracing::info!("seeded initial workspace data");
    Ok(())
}
