use sea_orm::JsonValue;
use sea_orm::entity::prelude::*;

use crate::types::{ActivityType, ScopeKind};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "activities")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub scope_kind: Option<ScopeKind>,
    pub scope_id: Option<i64>,
    pub activity_type: ActivityType,
    pub actor: String,
    pub metadata: JsonValue,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
