//! 統合テスト共通ヘルパー
//!
//! 一時ディレクトリ上のSQLiteデータベースと、差し替え可能なプロビジョニング参照を提供します。
#![allow(dead_code)]

use async_trait::async_trait;
use broker_migrate::adapters::table_ddl::TableDdlGenerator;
use broker_migrate::core::config::Dialect;
use broker_migrate::core::error::LookupError;
use broker_migrate::core::service::{InstanceDescriptor, IpMapping};
use broker_migrate::services::broker_migrations::{
    PLAN_DETAILS, PROVISION_REQUEST_DETAILS, SERVICE_BINDING_CREDENTIALS,
    SERVICE_INSTANCE_DETAILS,
};
use broker_migrate::services::service_catalog::ServiceCatalog;
use broker_migrate::services::step_services::StepServices;
use broker_migrate::services::traits::ProvisioningLookup;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyPool, Row};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const PROJECT_ID: &str = "test-project";

pub const CLOUDSQL_MYSQL_ID: &str = "4bc59b9a-8520-409f-85da-1c7552315863";
pub const BIGQUERY_ID: &str = "f80c0a3e-bd4d-4809-a900-b4e33a6450f1";
pub const ML_APIS_ID: &str = "5ad2dce0-51f7-4ede-8b46-293d6df1e8d4";
pub const STORAGE_ID: &str = "b9e4332e-b42b-4680-bda5-ea1506797474";
pub const PUBSUB_ID: &str = "628629e3-79f5-4255-b981-d14c6c7856be";

/// 一時ディレクトリにSQLiteデータベースを作成して接続
pub async fn sqlite_pool(temp_dir: &TempDir) -> AnyPool {
    install_default_drivers();
    let db_path = temp_dir.path().join("broker.db");
    let connection_string = format!("sqlite://{}?mode=rwc", db_path.to_str().unwrap());
    AnyPoolOptions::new()
        .max_connections(1)
        .connect(&connection_string)
        .await
        .unwrap()
}

/// マイグレーション導入前のブローカーDBを再現する（台帳テーブルは作らない）
pub async fn create_legacy_broker_tables(pool: &AnyPool) {
    create_legacy_broker_tables_in(pool, Dialect::SQLite).await;
}

/// 方言を指定してマイグレーション導入前のテーブルを作成
pub async fn create_legacy_broker_tables_in(pool: &AnyPool, dialect: Dialect) {
    let generator = TableDdlGenerator::new(dialect);
    for table in [
        SERVICE_INSTANCE_DETAILS,
        SERVICE_BINDING_CREDENTIALS,
        PROVISION_REQUEST_DETAILS,
        PLAN_DETAILS,
    ] {
        for sql in generator.generate_create_table(&table) {
            sqlx::query(&sql).execute(pool).await.unwrap();
        }
    }
}

/// サービスインスタンス行を追加
pub async fn insert_instance(pool: &AnyPool, id: &str, service_id: &str, other_details: &str) {
    insert_instance_in(pool, Dialect::SQLite, id, service_id, other_details).await;
}

/// 方言を指定してサービスインスタンス行を追加
pub async fn insert_instance_in(
    pool: &AnyPool,
    dialect: Dialect,
    id: &str,
    service_id: &str,
    other_details: &str,
) {
    let sql = format!(
        "INSERT INTO service_instance_details (id, name, other_details, service_id) VALUES ({}, {}, {}, {})",
        dialect.placeholder(1),
        dialect.placeholder(2),
        dialect.placeholder(3),
        dialect.placeholder(4)
    );
    sqlx::query(&sql)
        .bind(id.to_string())
        .bind(format!("{}-name", id))
        .bind(other_details.to_string())
        .bind(service_id.to_string())
        .execute(pool)
        .await
        .unwrap();
}

/// プロビジョニングリクエスト行を追加
pub async fn insert_request(pool: &AnyPool, instance_id: &str, request_details: &str) {
    insert_request_in(pool, Dialect::SQLite, instance_id, request_details).await;
}

/// 方言を指定してプロビジョニングリクエスト行を追加
pub async fn insert_request_in(
    pool: &AnyPool,
    dialect: Dialect,
    instance_id: &str,
    request_details: &str,
) {
    let sql = format!(
        "INSERT INTO provision_request_details (service_instance_id, request_details) VALUES ({}, {})",
        dialect.placeholder(1),
        dialect.placeholder(2)
    );
    sqlx::query(&sql)
        .bind(instance_id.to_string())
        .bind(request_details.to_string())
        .execute(pool)
        .await
        .unwrap();
}

/// 論理削除済みのプロビジョニングリクエスト行を追加
pub async fn insert_deleted_request(pool: &AnyPool, instance_id: &str, request_details: &str) {
    sqlx::query(
        "INSERT INTO provision_request_details (service_instance_id, request_details, deleted_at) VALUES (?, ?, ?)",
    )
    .bind(instance_id.to_string())
    .bind(request_details.to_string())
    .bind("2018-01-01 00:00:00".to_string())
    .execute(pool)
    .await
    .unwrap();
}

/// サービスインスタンスの other_details を取得
pub async fn other_details(pool: &AnyPool, id: &str) -> Option<String> {
    other_details_in(pool, Dialect::SQLite, id).await
}

/// 方言を指定してサービスインスタンスの other_details を取得
///
/// MySQLのtext型は sqlx::Any ではバイナリとして返るため、文字列に戻します。
pub async fn other_details_in(pool: &AnyPool, dialect: Dialect, id: &str) -> Option<String> {
    let sql = format!(
        "SELECT other_details FROM service_instance_details WHERE id = {}",
        dialect.placeholder(1)
    );
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_one(pool)
        .await
        .unwrap();

    match row.try_get::<Option<String>, _>(0) {
        Ok(text) => text,
        Err(_) => row
            .try_get::<Option<Vec<u8>>, _>(0)
            .unwrap()
            .map(|bytes| String::from_utf8(bytes).unwrap()),
    }
}

/// other_details をパースして取得
pub async fn other_details_map(pool: &AnyPool, id: &str) -> BTreeMap<String, String> {
    other_details_map_in(pool, Dialect::SQLite, id).await
}

/// 方言を指定して other_details をパースして取得
pub async fn other_details_map_in(
    pool: &AnyPool,
    dialect: Dialect,
    id: &str,
) -> BTreeMap<String, String> {
    let blob = other_details_in(pool, dialect, id).await.unwrap_or_default();
    serde_json::from_str(&blob).unwrap()
}

/// テーブルが存在するか
pub async fn table_exists(pool: &AnyPool, table: &str) -> bool {
    sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table.to_string())
        .fetch_optional(pool)
        .await
        .unwrap()
        .is_some()
}

/// 台帳に直接エントリを追加
pub async fn insert_ledger_entry(pool: &AnyPool, migration_id: i64) {
    sqlx::query("INSERT INTO migrations (migration_id) VALUES (?)")
        .bind(migration_id)
        .execute(pool)
        .await
        .unwrap();
}

/// 文字列ペアから詳細情報マップを作る
pub fn details(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// 固定のIPアドレスを返すプロビジョニング参照
///
/// 呼び出し履歴を (project_id, instance_name) で記録します。
#[derive(Debug, Default)]
pub struct FakeLookup {
    instances: HashMap<String, Vec<String>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(mut self, name: &str, addresses: &[&str]) -> Self {
        self.instances.insert(
            name.to_string(),
            addresses.iter().map(|a| a.to_string()).collect(),
        );
        self
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProvisioningLookup for FakeLookup {
    async fn get_instance(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<InstanceDescriptor, LookupError> {
        self.calls
            .lock()
            .unwrap()
            .push((project_id.to_string(), instance_name.to_string()));

        let addresses = self
            .instances
            .get(instance_name)
            .ok_or_else(|| LookupError::Status {
                status: 404,
                message: format!("instance {} not found", instance_name),
            })?;

        Ok(InstanceDescriptor {
            name: instance_name.to_string(),
            ip_addresses: addresses
                .iter()
                .map(|address| IpMapping {
                    ip_address: address.clone(),
                    kind: Some("PRIMARY".to_string()),
                })
                .collect(),
        })
    }
}

/// 常に失敗するプロビジョニング参照
#[derive(Debug, Default)]
pub struct FailingLookup;

#[async_trait]
impl ProvisioningLookup for FailingLookup {
    async fn get_instance(
        &self,
        _project_id: &str,
        _instance_name: &str,
    ) -> Result<InstanceDescriptor, LookupError> {
        Err(LookupError::Transport {
            message: "connection refused".to_string(),
        })
    }
}

/// テスト用のステップサービス
pub fn services(lookup: Arc<dyn ProvisioningLookup>) -> StepServices {
    StepServices::new(lookup, Arc::new(ServiceCatalog::builtin())).with_project_id(PROJECT_ID)
}

/// 外部参照を行わないテスト用のステップサービス
pub fn offline_services() -> StepServices {
    StepServices::offline(Arc::new(ServiceCatalog::builtin())).with_project_id(PROJECT_ID)
}
