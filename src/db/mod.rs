use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, Schema};

pub mod entities;
pub mod services;

use entities::{category, contact, sms_log, user};

/// Creates the four tables and their secondary indexes if they do not exist.
/// The schema is derived from the entity definitions, so foreign-key actions
/// (contact deletion cascades, log category set-null) live on the relations.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        schema.create_table_from_entity(user::Entity),
        schema.create_table_from_entity(category::Entity),
        schema.create_table_from_entity(contact::Entity),
        schema.create_table_from_entity(sms_log::Entity),
    ];
    for mut table in tables {
        table.if_not_exists();
        db.execute(backend.build(&table)).await?;
    }

    let indexes = schema
        .create_index_from_entity(contact::Entity)
        .into_iter()
        .chain(schema.create_index_from_entity(sms_log::Entity));
    for mut index in indexes {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    Ok(())
}
