// Adapters
// データベースと外部プロビジョニングAPIへのアクセスを抽象化

pub mod connection_string;
pub mod database;
pub mod migration_ledger;
pub mod provisioning_client;
pub mod table_ddl;
