//! Message edit history entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Record of a single content edit. Row *k*'s `old_content` is the content
/// that was in force after edit *k-1* (the original content for *k = 1*).
/// Rows are immutable once written.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Message that was edited
    #[sea_orm(indexed)]
    pub message_id: String,

    /// Content immediately before this edit
    #[sea_orm(column_type = "Text")]
    pub old_content: String,

    /// User who made the edit
    #[sea_orm(indexed)]
    pub edited_by: String,

    /// When the edit was made
    pub edited_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::message::Entity",
        from = "Column::MessageId",
        to = "super::message::Column::Id",
        on_delete = "Cascade"
    )]
    Message,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::EditedBy",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Editor,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Editor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
