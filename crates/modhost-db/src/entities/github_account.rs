use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// GitHub account imported by the `copilot_metrics` plugin.
///
/// The personal access token is stored encrypted (AES-256-GCM,
/// base64 `nonce‖ciphertext`) and is never serialized into responses.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "github_accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub login: String,
    #[sea_orm(unique)]
    pub github_user_id: i64,
    pub node_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_url: Option<String>,
    #[sea_orm(column_type = "Text")]
    #[serde(skip_serializing)]
    pub token_encrypted: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::copilot_metric::Entity")]
    CopilotMetrics,
}

impl Related<super::copilot_metric::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CopilotMetrics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
