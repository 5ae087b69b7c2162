use sea_orm::JsonValue;
use sea_orm::entity::prelude::*;

use crate::types::Priority;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub board_id: i64,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub position: f64,
    pub assignees: JsonValue,
    pub due_date: Option<DateTimeUtc>,
    pub label_ids: JsonValue,
    pub cover_image_id: Option<i64>,
    pub archived_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
