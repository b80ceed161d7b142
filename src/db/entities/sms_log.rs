use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per (recipient, send attempt). `twilio_sid` is absent when the
/// send call itself failed before reaching the provider. `status` is the
/// provider's vocabulary (queued, sent, delivered, failed, ...) and is only
/// ever rewritten by the status-callback handler, matched by sid.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sms_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub recipient: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub status: String,
    #[sea_orm(indexed)]
    pub category_id: Option<i32>,
    pub twilio_sid: Option<String>,
    #[sea_orm(indexed)]
    pub sent_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull",
        on_update = "Cascade"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
