use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QueryTrait, Set,
};

use crate::db::entities::{category, contact};

pub async fn count_contacts(db: &DatabaseConnection) -> Result<u64, DbErr> {
    contact::Entity::find().count(db).await
}

pub async fn list_with_category(
    db: &DatabaseConnection,
) -> Result<Vec<(contact::Model, Option<category::Model>)>, DbErr> {
    contact::Entity::find()
        .find_also_related(category::Entity)
        .order_by_desc(contact::Column::CreatedAt)
        .all(db)
        .await
}

/// The broadcast recipient set: every contact, or one category's contacts.
pub async fn list_recipients(
    db: &DatabaseConnection,
    category_id: Option<i32>,
) -> Result<Vec<contact::Model>, DbErr> {
    contact::Entity::find()
        .apply_if(category_id, |query, id| {
            query.filter(contact::Column::CategoryId.eq(id))
        })
        .all(db)
        .await
}

pub async fn create_contact(
    db: &DatabaseConnection,
    phone_number: &str,
    category_id: i32,
) -> Result<contact::Model, DbErr> {
    contact::ActiveModel {
        phone_number: Set(phone_number.to_owned()),
        category_id: Set(category_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

pub async fn delete_contact(db: &DatabaseConnection, id: i32) -> Result<u64, DbErr> {
    contact::Entity::delete_by_id(id)
        .exec(db)
        .await
        .map(|res| res.rows_affected)
}

/// Inserts pre-sanitized (phone, category) rows, skipping any phone number
/// that already exists. Returns the number of rows actually inserted.
pub async fn bulk_insert(
    db: &DatabaseConnection,
    rows: &[(String, i32)],
) -> Result<u64, DbErr> {
    if rows.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let models = rows.iter().map(|(phone_number, category_id)| contact::ActiveModel {
        phone_number: Set(phone_number.clone()),
        category_id: Set(*category_id),
        created_at: Set(now),
        ..Default::default()
    });

    contact::Entity::insert_many(models)
        .on_conflict(
            OnConflict::column(contact::Column::PhoneNumber)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
}
