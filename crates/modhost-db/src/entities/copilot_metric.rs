use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "copilot_metrics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub account_id: i32,
    pub fetched_at: DateTimeWithTimeZone,
    /// Raw metrics payload as returned by the upstream API.
    #[sea_orm(column_type = "JsonBinary")]
    pub payload: serde_json::Value,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::github_account::Entity",
        from = "Column::AccountId",
        to = "super::github_account::Column::Id"
    )]
    GithubAccount,
}

impl Related<super::github_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GithubAccount.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
