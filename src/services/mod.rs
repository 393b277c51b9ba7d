// Services Layer
// マイグレーションの実行とデータ変換を担うサービス層

pub mod broker_migrations;
pub mod config_loader;
pub mod details_transform;
pub mod migration_runner;
pub mod service_catalog;
pub mod step;
pub mod step_services;
pub mod traits;
