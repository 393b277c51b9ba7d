// migrateコマンドハンドラー
//
// ブローカーDBのマイグレーション適用機能を実装します。
// - 設定ファイルの読み込みとデータベース接続
// - プロビジョニングAPIクライアントとサービスカタログの組み立て
// - 未適用ステップの順次実行（1ステップ1トランザクション）
// - 実行結果のサマリー表示

use crate::cli::command_context::CommandContext;
use crate::services::broker_migrations::broker_migrations;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// migrateコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct MigrateCommand {
    /// 設定ファイルのパス（未指定の場合は既定のパス）
    pub config_path: Option<PathBuf>,
    /// 対象環境
    pub env: String,
    /// プロビジョニングAPI呼び出しの期限（秒）
    pub lookup_timeout: Option<u64>,
}

/// migrateコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct MigrateCommandHandler {}

impl MigrateCommandHandler {
    /// 新しいMigrateCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// migrateコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は適用したステップのサマリー、失敗時は失敗したステップと原因
    pub async fn execute(&self, command: &MigrateCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.clone())?;
        info!(env = %command.env, config = ?context.config_path, "Running broker migrations");

        let runner = context
            .runner(&command.env, command.lookup_timeout)
            .await?;
        let migrations = broker_migrations();

        let summary = runner
            .run(&migrations)
            .await
            .with_context(|| "Failed to migrate database")?;

        Ok(summary.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use sqlx::any::install_default_drivers;
    use std::fs;
    use tempfile::TempDir;

    fn write_sqlite_config(temp_dir: &TempDir) -> PathBuf {
        let db_path = temp_dir.path().join("broker.db");
        let config_path = temp_dir.path().join(Config::DEFAULT_CONFIG_PATH);
        fs::write(
            &config_path,
            format!(
                "version: \"1.0\"\ndialect: sqlite\nenvironments:\n  development:\n    database: {}\n",
                db_path.to_str().unwrap()
            ),
        )
        .unwrap();
        config_path
    }

    #[test]
    fn test_new_handler() {
        let handler = MigrateCommandHandler::new();
        assert!(format!("{:?}", handler).contains("MigrateCommandHandler"));
    }

    #[tokio::test]
    async fn test_migrate_fresh_database_then_rerun() {
        install_default_drivers();
        let temp_dir = TempDir::new().unwrap();
        let command = MigrateCommand {
            config_path: Some(write_sqlite_config(&temp_dir)),
            env: "development".to_string(),
            lookup_timeout: None,
        };

        let handler = MigrateCommandHandler::new();
        let output = handler.execute(&command).await.unwrap();
        assert!(output.contains("3 migration(s) applied"));
        assert!(output.contains("last applied: 2"));

        let output = handler.execute(&command).await.unwrap();
        assert!(output.contains("Database is up to date (last applied: 2)"));
    }

    #[tokio::test]
    async fn test_migrate_unknown_environment() {
        let temp_dir = TempDir::new().unwrap();
        let command = MigrateCommand {
            config_path: Some(write_sqlite_config(&temp_dir)),
            env: "production".to_string(),
            lookup_timeout: None,
        };

        let err = MigrateCommandHandler::new()
            .execute(&command)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("production"));
    }
}
