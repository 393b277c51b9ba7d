// 設定ファイル管理
//
// 設定ファイル（YAML形式）の構造、検証、環境別のデータベース接続設定、
// プロビジョニングAPIとサービスカタログの設定を扱います。

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// データベース方言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(rename = "postgresql")]
    PostgreSQL,
    #[serde(rename = "mysql")]
    MySQL,
    #[serde(rename = "sqlite")]
    SQLite,
}

impl Dialect {
    /// n番目（1始まり）のバインドパラメータのプレースホルダー
    ///
    /// sqlx::Any はプレースホルダーをそのままドライバに渡すため、方言ごとに書き分けます。
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::PostgreSQL => format!("${}", index),
            Dialect::MySQL | Dialect::SQLite => "?".to_string(),
        }
    }

    /// timestampカラムに文字列で日時を渡すためのプレースホルダー
    ///
    /// sqlx::Any は文字列をTEXTとして送るため、PostgreSQLでは明示的なキャストが必要です。
    pub fn timestamp_placeholder(&self, index: usize) -> String {
        match self {
            Dialect::PostgreSQL => format!("CAST(${} AS timestamp)", index),
            Dialect::MySQL | Dialect::SQLite => self.placeholder(index),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::PostgreSQL => write!(f, "postgresql"),
            Dialect::MySQL => write!(f, "mysql"),
            Dialect::SQLite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for Dialect {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postgresql" | "postgres" => Ok(Dialect::PostgreSQL),
            "mysql" => Ok(Dialect::MySQL),
            "sqlite" => Ok(Dialect::SQLite),
            other => Err(anyhow!(
                "Unsupported database dialect: {}. Please specify one of: postgresql, mysql, sqlite.",
                other
            )),
        }
    }
}

/// 設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 設定ファイルのバージョン
    pub version: String,

    /// データベース方言
    pub dialect: Dialect,

    /// 環境別のデータベース設定
    pub environments: HashMap<String, DatabaseConfig>,

    /// プロビジョニングAPI設定（未設定の場合は外部参照を行うステップが失敗する）
    #[serde(default)]
    pub provisioning: Option<ProvisioningConfig>,

    /// サービスID → サービス名 の追加・上書きエントリ
    #[serde(default)]
    pub services: BTreeMap<String, String>,
}

impl Config {
    /// デフォルトの設定ファイルパス
    pub const DEFAULT_CONFIG_PATH: &'static str = crate::core::naming::CONFIG_FILE;

    /// 指定された環境のデータベース設定を取得
    pub fn get_database_config(&self, environment: &str) -> Result<DatabaseConfig> {
        self.environments.get(environment).cloned().ok_or_else(|| {
            anyhow!(
                "Environment '{}' not found. Available environments: {:?}",
                environment,
                self.environments.keys().collect::<Vec<_>>()
            )
        })
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> Result<()> {
        if self.version.is_empty() {
            return Err(anyhow!("Config file version is not specified"));
        }

        if self.environments.is_empty() {
            return Err(anyhow!(
                "At least one environment configuration is required"
            ));
        }

        for (env_name, db_config) in &self.environments {
            db_config
                .validate()
                .with_context(|| format!("Invalid config for environment '{}'", env_name))?;
        }

        if let Some(provisioning) = &self.provisioning {
            provisioning
                .validate()
                .with_context(|| "Invalid provisioning config")?;
        }

        for (service_id, service_name) in &self.services {
            if service_id.is_empty() || service_name.is_empty() {
                return Err(anyhow!(
                    "Service catalog entries must have a non-empty id and name"
                ));
            }
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(yaml: &str) -> Result<Self, Self::Err> {
        serde_saphyr::from_str(yaml).with_context(|| "Failed to parse config file")
    }
}

/// データベース接続設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// ホスト名（SQLiteの場合は不要）
    #[serde(default = "default_host")]
    pub host: String,

    /// ポート番号
    #[serde(default = "default_port")]
    pub port: u16,

    /// データベース名（SQLiteの場合はファイルパス）
    pub database: String,

    /// ユーザー名
    pub user: Option<String>,

    /// パスワード
    pub password: Option<String>,

    /// 接続タイムアウト（秒）
    pub timeout: Option<u64>,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306 // ブローカーDBの既定はMySQL
}

impl DatabaseConfig {
    /// Validate database configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(anyhow!("Database name is not specified"));
        }

        Ok(())
    }
}

/// プロビジョニングAPI設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// APIエンドポイント
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// プロジェクトID（未指定の場合はサービスアカウントJSONから取得）
    pub project_id: Option<String>,

    /// Bearerトークン
    pub access_token: Option<String>,

    /// 外部呼び出しのタイムアウト（秒）
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://sqladmin.googleapis.com".to_string()
}

fn default_lookup_timeout() -> u64 {
    30
}

impl ProvisioningConfig {
    /// Validate provisioning configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(anyhow!("Provisioning endpoint is not specified"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("Provisioning timeout must be greater than zero"));
        }

        Ok(())
    }
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project_id: None,
            access_token: None,
            timeout_secs: default_lookup_timeout(),
        }
    }
}
