use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, QueryTrait, Set,
};

use crate::db::entities::{category, sms_log};

/// Status recorded when the send call fails before the provider assigns one.
pub const FAILED_STATUS: &str = "failed";
pub const DELIVERED_STATUS: &str = "delivered";

const HISTORY_LIMIT: u64 = 100;

pub async fn create_log(
    db: &DatabaseConnection,
    recipient: &str,
    message: &str,
    status: &str,
    category_id: Option<i32>,
    twilio_sid: Option<String>,
) -> Result<(), DbErr> {
    let log = sms_log::ActiveModel {
        recipient: Set(recipient.to_owned()),
        message: Set(message.to_owned()),
        status: Set(status.to_owned()),
        category_id: Set(category_id),
        twilio_sid: Set(twilio_sid),
        sent_at: Set(Utc::now()),
        ..Default::default()
    };
    sms_log::Entity::insert(log).exec_without_returning(db).await?;
    Ok(())
}

/// Blind status rewrite matched by provider sid. An unknown sid touches zero
/// rows, which the webhook deliberately does not treat as an error.
pub async fn update_status_by_sid(
    db: &DatabaseConnection,
    twilio_sid: &str,
    status: &str,
) -> Result<u64, DbErr> {
    sms_log::Entity::update_many()
        .col_expr(sms_log::Column::Status, Expr::value(status))
        .filter(sms_log::Column::TwilioSid.eq(twilio_sid))
        .exec(db)
        .await
        .map(|res| res.rows_affected)
}

pub async fn recent_with_category(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<(sms_log::Model, Option<category::Model>)>, DbErr> {
    sms_log::Entity::find()
        .find_also_related(category::Entity)
        .order_by_desc(sms_log::Column::SentAt)
        .limit(limit)
        .all(db)
        .await
}

pub async fn history(
    db: &DatabaseConnection,
    category_id: Option<i32>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Vec<(sms_log::Model, Option<category::Model>)>, DbErr> {
    sms_log::Entity::find()
        .find_also_related(category::Entity)
        .apply_if(category_id, |query, id| {
            query.filter(sms_log::Column::CategoryId.eq(id))
        })
        .apply_if(start, |query, ts| query.filter(sms_log::Column::SentAt.gte(ts)))
        .apply_if(end, |query, ts| query.filter(sms_log::Column::SentAt.lte(ts)))
        .order_by_desc(sms_log::Column::SentAt)
        .limit(HISTORY_LIMIT)
        .all(db)
        .await
}

pub async fn total_count(db: &DatabaseConnection) -> Result<u64, DbErr> {
    sms_log::Entity::find().count(db).await
}

pub async fn count_sent_since(
    db: &DatabaseConnection,
    since: DateTime<Utc>,
) -> Result<u64, DbErr> {
    sms_log::Entity::find()
        .filter(sms_log::Column::SentAt.gte(since))
        .count(db)
        .await
}

pub async fn delivered_count(db: &DatabaseConnection) -> Result<u64, DbErr> {
    sms_log::Entity::find()
        .filter(sms_log::Column::Status.eq(DELIVERED_STATUS))
        .count(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn unknown_sid_updates_zero_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let rows = update_status_by_sid(&db, "SM_does_not_exist", "delivered")
            .await
            .expect("blind update must not error");
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn known_sid_reports_affected_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let rows = update_status_by_sid(&db, "SM123", "delivered").await.unwrap();
        assert_eq!(rows, 1);
    }
}
