pub mod copilot_metric;
pub mod github_account;
pub mod item;
pub mod plugin_item;
