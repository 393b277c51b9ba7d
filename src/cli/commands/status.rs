// statusコマンドハンドラー
//
// マイグレーション状態の確認機能を実装します。
// - データベース接続と台帳テーブルの読み込み
// - ステップ一覧との照合（何も実行しない）
// - 台帳の欠番の検出と警告

use crate::cli::command_context::CommandContext;
use crate::services::broker_migrations::broker_migrations;
use crate::services::migration_runner::MigrationRunner;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::warn;

/// statusコマンドの入力パラメータ
#[derive(Debug, Clone)]
pub struct StatusCommand {
    /// 設定ファイルのパス（未指定の場合は既定のパス）
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: String,
}

/// statusコマンドハンドラー
#[derive(Debug, Clone, Default)]
pub struct StatusCommandHandler {}

impl StatusCommandHandler {
    /// 新しいStatusCommandHandlerを作成
    pub fn new() -> Self {
        Self {}
    }

    /// statusコマンドを実行
    ///
    /// # Returns
    ///
    /// 成功時は台帳の状態と未適用ステップの一覧
    pub async fn execute(&self, command: &StatusCommand) -> Result<String> {
        let context = CommandContext::load(command.config_path.clone())?;
        let pool = context.connect(&command.env).await?;

        // ステータス確認では外部参照を行わない
        let services = context.offline_step_services();
        let runner = MigrationRunner::new(pool, context.config.dialect, services);

        let status = runner
            .status(&broker_migrations())
            .await
            .with_context(|| "Failed to read migration ledger")?;

        if !status.contiguous {
            warn!(applied = ?status.applied, "Migration ledger is not contiguous");
        }

        Ok(status.render())
    }
}
