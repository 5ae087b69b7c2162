use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Projects::Table)
                    .col(pk_id_col(manager, Projects::Id))
                    .col(ColumnDef::new(Projects::Name).string().not_null())
                    .col(ColumnDef::new(Projects::Icon).string())
                    .col(ColumnDef::new(Projects::Description).text())
                    .col(ColumnDef::new(Projects::Color).string())
                    .col(bool_col(Projects::Starred))
                    .col(position_col(manager, Projects::Position))
                    .col(timestamp_col(Projects::CreatedAt))
                    .col(timestamp_col(Projects::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_projects_position")
                    .table(Projects::Table)
                    .col(Projects::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Boards::Table)
                    .col(pk_id_col(manager, Boards::Id))
                    .col(fk_id_col(manager, Boards::ProjectId))
                    .col(ColumnDef::new(Boards::Name).string().not_null())
                    .col(ColumnDef::new(Boards::Description).text())
                    .col(bool_col(Boards::Starred))
                    .col(position_col(manager, Boards::Position))
                    .col(timestamp_col(Boards::CreatedAt))
                    .col(timestamp_col(Boards::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_boards_project_id")
                            .from(Boards::Table, Boards::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_boards_project_id_position")
                    .table(Boards::Table)
                    .col(Boards::ProjectId)
                    .col(Boards::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Columns::Table)
                    .col(pk_id_col(manager, Columns::Id))
                    .col(fk_id_col(manager, Columns::BoardId))
                    .col(ColumnDef::new(Columns::Title).string().not_null())
                    .col(ColumnDef::new(Columns::Color).string())
                    .col(position_col(manager, Columns::Position))
                    .col(fk_id_nullable_col(manager, Columns::WipLimit))
                    .col(timestamp_col(Columns::CreatedAt))
                    .col(timestamp_col(Columns::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_columns_board_id")
                            .from(Columns::Table, Columns::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_columns_board_id_position")
                    .table(Columns::Table)
                    .col(Columns::BoardId)
                    .col(Columns::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Tasks::Table)
                    .col(pk_id_col(manager, Tasks::Id))
                    .col(fk_id_col(manager, Tasks::BoardId))
                    .col(fk_id_col(manager, Tasks::ColumnId))
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::Description).text())
                    .col(
                        ColumnDef::new(Tasks::Priority)
                            .string_len(32)
                            .not_null()
                            .default(Expr::val("medium")),
                    )
                    .col(
                        ColumnDef::new(Tasks::Position)
                            .double()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(Tasks::Assignees).json().not_null())
                    .col(ColumnDef::new(Tasks::DueDate).timestamp())
                    .col(ColumnDef::new(Tasks::LabelIds).json().not_null())
                    .col(fk_id_nullable_col(manager, Tasks::CoverImageId))
                    .col(ColumnDef::new(Tasks::ArchivedAt).timestamp())
                    .col(ColumnDef::new(Tasks::CompletedAt).timestamp())
                    .col(timestamp_col(Tasks::CreatedAt))
                    .col(timestamp_col(Tasks::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_board_id")
                            .from(Tasks::Table, Tasks::BoardId)
                            .to(Boards::Table, Boards::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_column_id")
                            .from(Tasks::Table, Tasks::ColumnId)
                            .to(Columns::Table, Columns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_board_id")
                    .table(Tasks::Table)
                    .col(Tasks::BoardId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_column_id_position")
                    .table(Tasks::Table)
                    .col(Tasks::ColumnId)
                    .col(Tasks::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_tasks_archived_at")
                    .table(Tasks::Table)
                    .col(Tasks::ArchivedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Labels::Table)
                    .col(pk_id_col(manager, Labels::Id))
                    .col(fk_id_col(manager, Labels::ProjectId))
                    .col(ColumnDef::new(Labels::Name).string().not_null())
                    .col(ColumnDef::new(Labels::Color).string().not_null())
                    .col(position_col(manager, Labels::Position))
                    .col(timestamp_col(Labels::CreatedAt))
                    .col(timestamp_col(Labels::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_labels_project_id")
                            .from(Labels::Table, Labels::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_labels_project_id_position")
                    .table(Labels::Table)
                    .col(Labels::ProjectId)
                    .col(Labels::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ChecklistItems::Table)
                    .col(pk_id_col(manager, ChecklistItems::Id))
                    .col(fk_id_col(manager, ChecklistItems::TaskId))
                    .col(ColumnDef::new(ChecklistItems::Text).string().not_null())
                    .col(bool_col(ChecklistItems::Completed))
                    .col(position_col(manager, ChecklistItems::Position))
                    .col(ColumnDef::new(ChecklistItems::CompletedAt).timestamp())
                    .col(timestamp_col(ChecklistItems::CreatedAt))
                    .col(timestamp_col(ChecklistItems::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checklist_items_task_id")
                            .from(ChecklistItems::Table, ChecklistItems::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_checklist_items_task_id_position")
                    .table(ChecklistItems::Table)
                    .col(ChecklistItems::TaskId)
                    .col(ChecklistItems::Position)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Comments::Table)
                    .col(pk_id_col(manager, Comments::Id))
                    .col(fk_id_col(manager, Comments::TaskId))
                    .col(ColumnDef::new(Comments::Author).string().not_null())
                    .col(ColumnDef::new(Comments::AuthorAvatar).string())
                    .col(ColumnDef::new(Comments::Content).text().not_null())
                    .col(timestamp_col(Comments::CreatedAt))
                    .col(timestamp_col(Comments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_comments_task_id")
                            .from(Comments::Table, Comments::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_comments_task_id_created_at")
                    .table(Comments::Table)
                    .col(Comments::TaskId)
                    .col(Comments::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Attachments::Table)
                    .col(pk_id_col(manager, Attachments::Id))
                    .col(fk_id_col(manager, Attachments::TaskId))
                    .col(ColumnDef::new(Attachments::Name).string().not_null())
                    .col(ColumnDef::new(Attachments::MimeType).string().not_null())
                    .col(
                        ColumnDef::new(Attachments::Size)
                            .big_integer()
                            .not_null()
                            .default(Expr::val(0)),
                    )
                    .col(ColumnDef::new(Attachments::BlobData).blob())
                    .col(ColumnDef::new(Attachments::Url).string())
                    .col(ColumnDef::new(Attachments::UploadedBy).string().not_null())
                    .col(timestamp_col(Attachments::CreatedAt))
                    .col(timestamp_col(Attachments::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attachments_task_id")
                            .from(Attachments::Table, Attachments::TaskId)
                            .to(Tasks::Table, Tasks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_attachments_task_id")
                    .table(Attachments::Table)
                    .col(Attachments::TaskId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Activities::Table)
                    .col(pk_id_col(manager, Activities::Id))
                    .col(ColumnDef::new(Activities::ScopeKind).string_len(32))
                    .col(fk_id_nullable_col(manager, Activities::ScopeId))
                    .col(
                        ColumnDef::new(Activities::ActivityType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Activities::Actor).string().not_null())
                    .col(ColumnDef::new(Activities::Metadata).json().not_null())
                    .col(timestamp_col(Activities::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activities_scope")
                    .table(Activities::Table)
                    .col(Activities::ScopeKind)
                    .col(Activities::ScopeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_activities_created_at")
                    .table(Activities::Table)
                    .col(Activities::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Notifications::Table)
                    .col(pk_id_col(manager, Notifications::Id))
                    .col(
                        ColumnDef::new(Notifications::NotificationType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Notifications::ScopeKind).string_len(32))
                    .col(fk_id_nullable_col(manager, Notifications::ScopeId))
                    .col(ColumnDef::new(Notifications::Title).string().not_null())
                    .col(ColumnDef::new(Notifications::Message).text().not_null())
                    .col(bool_col(Notifications::Read))
                    .col(timestamp_col(Notifications::CreatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_notifications_read_created_at")
                    .table(Notifications::Table)
                    .col(Notifications::Read)
                    .col(Notifications::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(ChangeLog::Table)
                    .col(pk_id_col(manager, ChangeLog::Id))
                    .col(
                        ColumnDef::new(ChangeLog::TableName)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChangeLog::Op).string_len(16).not_null())
                    .col(fk_id_nullable_col(manager, ChangeLog::EntityId))
                    .col(timestamp_col(ChangeLog::CreatedAt))
                    .col(ColumnDef::new(ChangeLog::PublishedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_change_log_published_at")
                    .table(ChangeLog::Table)
                    .col(ChangeLog::PublishedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create().if_not_exists()
                    .table(Settings::Table)
                    .col(pk_id_col(manager, Settings::Id))
                    .col(ColumnDef::new(Settings::Key).string().not_null())
                    .col(ColumnDef::new(Settings::Value).text().not_null())
                    .col(timestamp_col(Settings::CreatedAt))
                    .col(timestamp_col(Settings::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create().if_not_exists()
                    .name("idx_settings_key")
                    .table(Settings::Table)
                    .col(Settings::Key)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Settings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChangeLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Notifications::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Activities::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attachments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Comments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChecklistItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Labels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Columns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Boards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await?;
        Ok(())
    }
}

fn pk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().auto_increment().primary_key().to_owned()
}

fn fk_id_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.not_null().to_owned()
}

fn fk_id_nullable_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = ColumnDef::new(col);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => {
            col.integer();
        }
        _ => {
            col.big_integer();
        }
    }
    col.to_owned()
}

fn position_col<T: Iden>(manager: &SchemaManager, col: T) -> ColumnDef {
    let mut col = fk_id_col(manager, col);
    col.default(Expr::val(0)).to_owned()
}

fn bool_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .boolean()
        .not_null()
        .default(Expr::val(false))
        .to_owned()
}

fn timestamp_col<T: Iden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp()
        .not_null()
        .default(Expr::current_timestamp())
        .to_owned()
}

#[derive(Iden)]
enum Projects {
    Table,
    Id,
    Name,
    Icon,
    Description,
    Color,
    Starred,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Boards {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    Starred,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Columns {
    Table,
    Id,
    BoardId,
    Title,
    Color,
    Position,
    WipLimit,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    BoardId,
    ColumnId,
    Title,
    Description,
    Priority,
    Position,
    Assignees,
    DueDate,
    LabelIds,
    CoverImageId,
    ArchivedAt,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Labels {
    Table,
    Id,
    ProjectId,
    Name,
    Color,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ChecklistItems {
    Table,
    Id,
    TaskId,
    Text,
    Completed,
    Position,
    CompletedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Comments {
    Table,
    Id,
    TaskId,
    Author,
    AuthorAvatar,
    Content,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Attachments {
    Table,
    Id,
    TaskId,
    Name,
    MimeType,
    Size,
    BlobData,
    Url,
    UploadedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Activities {
    Table,
    Id,
    ScopeKind,
    ScopeId,
    ActivityType,
    Actor,
    Metadata,
    CreatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
    NotificationType,
    ScopeKind,
    ScopeId,
    Title,
    Message,
    Read,
    CreatedAt,
}

#[derive(Iden)]
enum ChangeLog {
    Table,
    Id,
    TableName,
    Op,
    EntityId,
    CreatedAt,
    PublishedAt,
}

#[derive(Iden)]
enum Settings {
    Table,
    Id,
    Key,
    Value,
    CreatedAt,
    UpdatedAt,
}
