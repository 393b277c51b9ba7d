// エラー型定義
//
// マイグレーション実行全体で使用されるカスタムエラー型を提供します。
// thiserrorを使用して、DatabaseError, LookupError, CatalogError, StepError, MigrationError を定義します。
//
// どのエラーも再試行や警告への格下げは行わず、そのまま呼び出し元へ伝播させます。

use thiserror::Error;

/// データベースエラー
#[derive(Debug, Clone, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection error: {message} (cause: {cause})")]
    Connection {
        /// エラーメッセージ
        message: String,
        /// エラー原因
        cause: String,
    },

    /// Query execution error
    #[error("Query execution error: {message}")]
    Query {
        /// エラーメッセージ
        message: String,
        /// 失敗したSQL
        sql: Option<String>,
    },

    /// Transaction error
    #[error("Transaction error: {message}")]
    Transaction {
        /// エラーメッセージ
        message: String,
    },
}

impl DatabaseError {
    /// SQL付きのクエリエラーを作成
    pub fn query(message: impl Into<String>, sql: impl Into<String>) -> Self {
        DatabaseError::Query {
            message: message.into(),
            sql: Some(sql.into()),
        }
    }

    /// 失敗したSQLを取得
    pub fn sql(&self) -> Option<&str> {
        match self {
            DatabaseError::Query { sql, .. } => sql.as_deref(),
            _ => None,
        }
    }
}

/// プロビジョニングAPI参照エラー
///
/// 外部呼び出しの失敗はステップの失敗としてそのまま表面化します。
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    /// Transport error
    #[error("Error getting instance from api: {message}")]
    Transport {
        /// エラーメッセージ
        message: String,
    },

    /// Non-success HTTP status
    #[error("Error getting instance from api: HTTP {status}: {message}")]
    Status {
        /// HTTPステータスコード
        status: u16,
        /// レスポンス本文
        message: String,
    },

    /// Response body could not be decoded
    #[error("Could not decode instance descriptor: {message}")]
    Decode {
        /// エラーメッセージ
        message: String,
    },

    /// Instance has no assigned address
    #[error("Instance '{instance}' has no IP addresses assigned")]
    NoIpAddress {
        /// インスタンス名
        instance: String,
    },

    /// Deadline exceeded
    #[error("Lookup of instance '{instance}' timed out after {timeout_secs}s")]
    Timeout {
        /// インスタンス名
        instance: String,
        /// タイムアウト秒数
        timeout_secs: u64,
    },

    /// Project id could not be determined
    #[error("Could not determine project id: {message}")]
    ProjectId {
        /// エラーメッセージ
        message: String,
    },

    /// Provisioning service is not configured
    #[error("Provisioning service is not configured")]
    NotConfigured,
}

/// サービスカタログ参照エラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// The service id is not registered
    #[error("unrecognized service: {service_id}")]
    UnknownServiceId {
        /// サービスID
        service_id: String,
    },

    /// The service is registered but has no transformation rules
    #[error("unrecognized service: {service_id} ({service_name})")]
    UnsupportedService {
        /// サービスID
        service_id: String,
        /// サービス名
        service_name: String,
    },
}

/// マイグレーションステップ実行エラー
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// Statement or row access failed
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// A stored detail blob is not a flat JSON object of strings
    #[error("Malformed details for record '{record}': {message}")]
    MalformedDetails {
        /// 対象レコードのキー
        record: String,
        /// パースエラー
        message: String,
    },

    /// A referenced row does not exist
    #[error("Record not found in {table}: {key}")]
    MissingRecord {
        /// テーブル名
        table: String,
        /// 検索キー
        key: String,
    },

    /// Category could not be resolved
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// External provisioning lookup failed
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Details could not be re-serialized
    #[error("Could not serialize details: {message}")]
    Serialize {
        /// エラーメッセージ
        message: String,
    },

    /// The ledger entry could not be written
    #[error("Failed to record migration: {0}")]
    LedgerWrite(DatabaseError),
}

/// マイグレーション実行エラー
///
/// 実行全体を中断させるエラー。台帳は失敗前の状態のまま残ります。
#[derive(Debug, Clone, Error)]
pub enum MigrationError {
    /// The ledger could not be read; no step was executed
    #[error("Error getting last migration id: {0}")]
    LedgerRead(DatabaseError),

    /// A step failed and its transaction was rolled back
    #[error("Migration {index} ({description}) failed: {source}")]
    Step {
        /// ステップ番号
        index: usize,
        /// ステップの説明
        description: String,
        /// 原因
        source: StepError,
    },
}

impl MigrationError {
    /// 失敗したステップ番号を取得
    pub fn step_index(&self) -> Option<usize> {
        match self {
            MigrationError::LedgerRead(_) => None,
            MigrationError::Step { index, .. } => Some(*index),
        }
    }

    /// ステップエラーを取得
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            MigrationError::LedgerRead(_) => None,
            MigrationError::Step { source, .. } => Some(source),
        }
    }
}
