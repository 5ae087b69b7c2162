use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::setting;

pub struct Setting;

impl Setting {
    pub async fn get<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<String>, DbErr> {
        let record = setting::Entity::find()
            .filter(setting::Column::Key.eq(key))
            .one(db)
            .await?;
        Ok(record.map(|model| model.value))
    }

    pub async fn put<C: ConnectionTrait>(db: &C, key: &str, value: &str) -> Result<(), DbErr> {
        let now = Utc::now();
        let existing = setting::Entity::find()
            .filter(setting::Column::Key.eq(key))
            .one(db)
            .await?;

        match existing {
            Some(record) => {
                let mut active: setting::ActiveModel = record.into();
                active.value = Set(value.to_string());
                active.updated_at = Set(now);
                active.update(db).await?;
            }
            None => {
                let active = setting::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };
                active.insert(db).await?;
            }
        }
        Ok(())
    }
}
