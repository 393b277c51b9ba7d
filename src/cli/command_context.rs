// コマンド共通コンテキスト
//
// 設定ファイル読み込み、接続プール作成、ステップサービス組み立ての重複をCLI層で集約する。

use crate::adapters::database::DatabaseConnectionService;
use crate::adapters::provisioning_client::CloudSqlAdminClient;
use crate::core::config::{Config, DatabaseConfig};
use crate::services::config_loader::ConfigLoader;
use crate::services::migration_runner::MigrationRunner;
use crate::services::service_catalog::ServiceCatalog;
use crate::services::step_services::{ProjectIdSource, StepServices};
use anyhow::{anyhow, Context, Result};
use sqlx::AnyPool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// CLIコマンド共通の実行コンテキスト
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config_path: PathBuf,
    pub config: Config,
}

impl CommandContext {
    /// 設定ファイルを読み込んでコンテキストを作成
    ///
    /// パスが指定されない場合はカレントディレクトリの既定ファイルを使用します。
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path =
            config_path.unwrap_or_else(|| PathBuf::from(Config::DEFAULT_CONFIG_PATH));
        if !config_path.exists() {
            return Err(anyhow!("Config file not found: {:?}", config_path));
        }

        let config =
            ConfigLoader::from_file(&config_path).with_context(|| "Failed to read config file")?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// 環境のデータベース設定
    pub fn database_config(&self, env: &str) -> Result<DatabaseConfig> {
        self.config
            .get_database_config(env)
            .with_context(|| format!("Config for environment '{}' not found", env))
    }

    /// 環境のデータベースに接続
    pub async fn connect(&self, env: &str) -> Result<AnyPool> {
        let db_config = self.database_config(env)?;
        DatabaseConnectionService::new()
            .create_pool(self.config.dialect, &db_config)
            .await
            .with_context(|| "Failed to connect to database")
    }

    /// 設定からステップサービスを組み立てる
    ///
    /// プロビジョニング設定が無い場合、外部参照が必要な行に出会ったステップは失敗します。
    pub fn step_services(&self, lookup_timeout: Option<u64>) -> Result<StepServices> {
        let Some(provisioning) = &self.config.provisioning else {
            return Ok(self.offline_step_services());
        };

        let client = CloudSqlAdminClient::new(provisioning)
            .with_context(|| "Failed to create provisioning client")?;
        let project_id = match &provisioning.project_id {
            Some(project_id) => ProjectIdSource::Fixed(project_id.clone()),
            None => ProjectIdSource::default(),
        };
        let timeout = lookup_timeout.unwrap_or(provisioning.timeout_secs);

        Ok(StepServices::new(Arc::new(client), Arc::new(self.service_catalog()))
            .with_project_id_source(project_id)
            .with_lookup_timeout(Duration::from_secs(timeout)))
    }

    /// 外部参照を行わないステップサービスを組み立てる
    pub fn offline_step_services(&self) -> StepServices {
        StepServices::offline(Arc::new(self.service_catalog()))
    }

    /// 組み込みカタログに設定の上書きを適用したサービスカタログ
    pub fn service_catalog(&self) -> ServiceCatalog {
        ServiceCatalog::builtin().with_overrides(&self.config.services)
    }

    /// 環境に接続したランナーを作成
    pub async fn runner(&self, env: &str, lookup_timeout: Option<u64>) -> Result<MigrationRunner> {
        let services = self.step_services(lookup_timeout)?;
        let pool = self.connect(env).await?;
        Ok(MigrationRunner::new(pool, self.config.dialect, services))
    }
}
