use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    Default,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    #[sea_orm(string_value = "urgent")]
    Urgent,
    #[sea_orm(string_value = "high")]
    High,
    #[default]
    #[sea_orm(string_value = "medium")]
    Medium,
    #[sea_orm(string_value = "low")]
    Low,
}

impl Priority {
    /// Numeric rank used by sorting. Urgent sorts first ascending.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityType {
    #[sea_orm(string_value = "task_created")]
    TaskCreated,
    #[sea_orm(string_value = "task_updated")]
    TaskUpdated,
    #[sea_orm(string_value = "task_moved")]
    TaskMoved,
    #[sea_orm(string_value = "task_archived")]
    TaskArchived,
    #[sea_orm(string_value = "task_restored")]
    TaskRestored,
    #[sea_orm(string_value = "task_deleted")]
    TaskDeleted,
    #[sea_orm(string_value = "task_completed")]
    TaskCompleted,
    #[sea_orm(string_value = "comment_added")]
    CommentAdded,
    #[sea_orm(string_value = "attachment_added")]
    AttachmentAdded,
    #[sea_orm(string_value = "attachment_removed")]
    AttachmentRemoved,
    #[sea_orm(string_value = "checklist_item_added")]
    ChecklistItemAdded,
    #[sea_orm(string_value = "checklist_item_completed")]
    ChecklistItemCompleted,
    #[sea_orm(string_value = "label_added")]
    LabelAdded,
    #[sea_orm(string_value = "label_removed")]
    LabelRemoved,
    #[sea_orm(string_value = "assignee_added")]
    AssigneeAdded,
    #[sea_orm(string_value = "assignee_removed")]
    AssigneeRemoved,
    #[sea_orm(string_value = "priority_changed")]
    PriorityChanged,
    #[sea_orm(string_value = "due_date_changed")]
    DueDateChanged,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    #[sea_orm(string_value = "task_assigned")]
    TaskAssigned,
    #[sea_orm(string_value = "task_due_soon")]
    TaskDueSoon,
    #[sea_orm(string_value = "task_overdue")]
    TaskOverdue,
    #[sea_orm(string_value = "task_completed")]
    TaskCompleted,
    #[sea_orm(string_value = "comment_added")]
    CommentAdded,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ScopeKind {
    #[sea_orm(string_value = "task")]
    Task,
    #[sea_orm(string_value = "board")]
    Board,
    #[sea_orm(string_value = "project")]
    Project,
}

/// What an activity or notification is attached to. The tagged variants make
/// a kind without an id (or the reverse) unrepresentable in the API; rows
/// persist it as a nullable `scope_kind` + `scope_id` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Scope {
    Task(i64),
    Board(i64),
    Project(i64),
    Global,
}

impl Scope {
    pub fn kind(&self) -> Option<ScopeKind> {
        match self {
            Scope::Task(_) => Some(ScopeKind::Task),
            Scope::Board(_) => Some(ScopeKind::Board),
            Scope::Project(_) => Some(ScopeKind::Project),
            Scope::Global => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        match self {
            Scope::Task(id) | Scope::Board(id) | Scope::Project(id) => Some(*id),
            Scope::Global => None,
        }
    }

    pub fn from_columns(kind: Option<ScopeKind>, id: Option<i64>) -> Scope {
        match (kind, id) {
            (Some(ScopeKind::Task), Some(id)) => Scope::Task(id),
            (Some(ScopeKind::Board), Some(id)) => Scope::Board(id),
            (Some(ScopeKind::Project), Some(id)) => Scope::Project(id),
            _ => Scope::Global,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    #[sea_orm(string_value = "projects")]
    Projects,
    #[sea_orm(string_value = "boards")]
    Boards,
    #[sea_orm(string_value = "columns")]
    Columns,
    #[sea_orm(string_value = "tasks")]
    Tasks,
    #[sea_orm(string_value = "labels")]
    Labels,
    #[sea_orm(string_value = "checklist_items")]
    ChecklistItems,
    #[sea_orm(string_value = "comments")]
    Comments,
    #[sea_orm(string_value = "attachments")]
    Attachments,
    #[sea_orm(string_value = "activities")]
    Activities,
    #[sea_orm(string_value = "notifications")]
    Notifications,
    #[sea_orm(string_value = "templates")]
    Templates,
    #[sea_orm(string_value = "settings")]
    Settings,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChangeOp {
    #[sea_orm(string_value = "insert")]
    Insert,
    #[sea_orm(string_value = "update")]
    Update,
    #[sea_orm(string_value = "delete")]
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSortField {
    Priority,
    DueDate,
    CreatedAt,
    Title,
    Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}
