use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::db::entities::{category, contact, sms_log};

pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<category::Model>, DbErr> {
    category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
}

pub async fn create_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<category::Model, DbErr> {
    category::ActiveModel {
        name: Set(name.to_owned()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Deleting a category cascades to its contacts and leaves its message logs
/// with a null category (both enforced by the schema's foreign keys).
pub async fn delete_category(db: &DatabaseConnection, id: i32) -> Result<u64, DbErr> {
    category::Entity::delete_by_id(id)
        .exec(db)
        .await
        .map(|res| res.rows_affected)
}

pub async fn contact_count(db: &DatabaseConnection, category_id: i32) -> Result<u64, DbErr> {
    contact::Entity::find()
        .filter(contact::Column::CategoryId.eq(category_id))
        .count(db)
        .await
}

pub async fn message_count(db: &DatabaseConnection, category_id: i32) -> Result<u64, DbErr> {
    sms_log::Entity::find()
        .filter(sms_log::Column::CategoryId.eq(category_id))
        .count(db)
        .await
}
