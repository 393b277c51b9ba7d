// マイグレーション台帳アダプター
//
// 適用済みステップ番号を保持する migrations テーブルの読み書きを担当します。
// 台帳テーブル自体はステップ0で作成されるため、テーブルが存在しないことは
// 「まだ何も適用されていない」ことを意味し、エラーではありません。

use crate::adapters::table_ddl::{ColumnType, KeyColumn, TableDefinition};
use crate::core::config::Dialect;
use crate::core::error::DatabaseError;
use crate::core::migration::LedgerEntry;
use crate::core::naming::LEDGER_TABLE;
use sqlx::{AnyConnection, AnyPool, Row};
use tracing::debug;

/// 台帳テーブルの定義
pub const LEDGER_TABLE_DEFINITION: TableDefinition = TableDefinition {
    name: LEDGER_TABLE,
    key: KeyColumn::Serial,
    columns: &[("migration_id", ColumnType::Integer)],
    index_deleted_at: false,
};

/// マイグレーション台帳
///
/// 読み取りはプールに対して、書き込みはステップのトランザクション内で行います。
#[derive(Debug, Clone)]
pub struct MigrationLedger {
    dialect: Dialect,
}

impl MigrationLedger {
    /// 新しいMigrationLedgerを作成
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// 台帳テーブル存在確認SQLを生成
    ///
    /// テーブル名はバインドパラメータとして渡します。
    /// information_schema の name 型は sqlx::Any でデコードできないため定数を返します。
    pub fn generate_check_ledger_table_exists_sql(&self) -> String {
        match self.dialect {
            Dialect::PostgreSQL => {
                "SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1"
                    .to_string()
            }
            Dialect::MySQL => {
                "SELECT 1 FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?"
                    .to_string()
            }
            Dialect::SQLite => {
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?".to_string()
            }
        }
    }

    /// 最終適用番号取得SQLを生成
    pub fn generate_last_applied_sql(&self) -> String {
        format!(
            "SELECT migration_id FROM {} WHERE deleted_at IS NULL AND migration_id IS NOT NULL ORDER BY migration_id DESC LIMIT 1",
            LEDGER_TABLE
        )
    }

    /// 適用済み番号一覧取得SQLを生成
    pub fn generate_applied_ordinals_sql(&self) -> String {
        format!(
            "SELECT migration_id FROM {} WHERE deleted_at IS NULL AND migration_id IS NOT NULL ORDER BY migration_id",
            LEDGER_TABLE
        )
    }

    /// 台帳記録のINSERT SQLを生成（パラメータバインド対応）
    ///
    /// パラメータ順は created_at, updated_at, migration_id です。
    pub fn generate_record_applied_sql(&self) -> String {
        format!(
            "INSERT INTO {} (created_at, updated_at, migration_id) VALUES ({}, {}, {})",
            LEDGER_TABLE,
            self.dialect.timestamp_placeholder(1),
            self.dialect.timestamp_placeholder(2),
            self.dialect.placeholder(3)
        )
    }

    /// 台帳テーブルが存在するか確認
    pub async fn ledger_table_exists(&self, pool: &AnyPool) -> Result<bool, DatabaseError> {
        let sql = self.generate_check_ledger_table_exists_sql();

        let row = sqlx::query(&sql)
            .bind(LEDGER_TABLE)
            .fetch_optional(pool)
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to check ledger table: {}", e), sql.clone())
            })?;

        Ok(row.is_some())
    }

    /// 最終適用番号を取得
    ///
    /// # Returns
    ///
    /// 台帳テーブルが存在しないか空の場合はNone
    pub async fn last_applied(&self, pool: &AnyPool) -> Result<Option<i64>, DatabaseError> {
        if !self.ledger_table_exists(pool).await? {
            debug!("Ledger table does not exist yet");
            return Ok(None);
        }

        let sql = self.generate_last_applied_sql();
        let row = sqlx::query(&sql).fetch_optional(pool).await.map_err(|e| {
            DatabaseError::query(
                format!(
                    "Failed to read last migration id even though the ledger table exists: {}",
                    e
                ),
                sql.clone(),
            )
        })?;

        row.map(|row| row.try_get::<i64, _>(0))
            .transpose()
            .map_err(|e| DatabaseError::query(format!("Invalid migration id: {}", e), sql))
    }

    /// 適用済みのステップ番号を昇順で取得
    pub async fn applied_ordinals(&self, pool: &AnyPool) -> Result<Vec<i64>, DatabaseError> {
        if !self.ledger_table_exists(pool).await? {
            return Ok(Vec::new());
        }

        let sql = self.generate_applied_ordinals_sql();
        let rows = sqlx::query(&sql).fetch_all(pool).await.map_err(|e| {
            DatabaseError::query(format!("Failed to read migration ledger: {}", e), sql.clone())
        })?;

        rows.iter()
            .map(|row| row.try_get::<i64, _>(0))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DatabaseError::query(format!("Invalid migration id: {}", e), sql))
    }

    /// 台帳にステップ番号を記録
    ///
    /// ステップ本体と同じトランザクションの接続を渡すこと。
    /// コミットされれば記録が残り、ロールバックされれば記録も消えます。
    pub async fn record_applied(
        &self,
        conn: &mut AnyConnection,
        ordinal: i64,
    ) -> Result<(), DatabaseError> {
        let entry = LedgerEntry::new(ordinal);
        let timestamp = entry.timestamp_literal();
        let sql = self.generate_record_applied_sql();

        sqlx::query(&sql)
            .bind(timestamp.clone())
            .bind(timestamp)
            .bind(entry.migration_id)
            .execute(conn)
            .await
            .map_err(|e| {
                DatabaseError::query(format!("Failed to record migration {}: {}", ordinal, e), sql)
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::table_ddl::TableDdlGenerator;
    use sqlx::any::{install_default_drivers, AnyPoolOptions};
    use tempfile::TempDir;

    async fn sqlite_pool(temp_dir: &TempDir) -> AnyPool {
        install_default_drivers();
        let db_path = temp_dir.path().join("ledger.db");
        let connection_string = format!("sqlite://{}?mode=rwc", db_path.to_str().unwrap());
        AnyPoolOptions::new()
            .max_connections(1)
            .connect(&connection_string)
            .await
            .unwrap()
    }

    async fn create_ledger_table(pool: &AnyPool) {
        for sql in
            TableDdlGenerator::new(Dialect::SQLite).generate_create_table(&LEDGER_TABLE_DEFINITION)
        {
            sqlx::query(&sql).execute(pool).await.unwrap();
        }
    }

    #[test]
    fn test_generate_check_ledger_table_exists_sql() {
        let postgres = MigrationLedger::new(Dialect::PostgreSQL);
        let sql = postgres.generate_check_ledger_table_exists_sql();
        assert!(sql.starts_with("SELECT 1 FROM information_schema.tables"));
        assert!(sql.contains("$1"));

        let mysql = MigrationLedger::new(Dialect::MySQL);
        assert!(mysql
            .generate_check_ledger_table_exists_sql()
            .contains("DATABASE()"));

        let sqlite = MigrationLedger::new(Dialect::SQLite);
        assert!(sqlite
            .generate_check_ledger_table_exists_sql()
            .contains("sqlite_master"));
    }

    #[test]
    fn test_generate_record_applied_sql_placeholders() {
        let postgres = MigrationLedger::new(Dialect::PostgreSQL);
        assert_eq!(
            postgres.generate_record_applied_sql(),
            "INSERT INTO migrations (created_at, updated_at, migration_id) VALUES (CAST($1 AS timestamp), CAST($2 AS timestamp), $3)"
        );

        let mysql = MigrationLedger::new(Dialect::MySQL);
        assert_eq!(
            mysql.generate_record_applied_sql(),
            "INSERT INTO migrations (created_at, updated_at, migration_id) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_generate_last_applied_sql_skips_soft_deleted() {
        let ledger = MigrationLedger::new(Dialect::SQLite);
        let sql = ledger.generate_last_applied_sql();
        assert!(sql.contains("deleted_at IS NULL"));
        assert!(sql.contains("ORDER BY migration_id DESC"));
    }

    #[tokio::test]
    async fn test_last_applied_without_table_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&temp_dir).await;
        let ledger = MigrationLedger::new(Dialect::SQLite);

        assert!(!ledger.ledger_table_exists(&pool).await.unwrap());
        assert_eq!(ledger.last_applied(&pool).await.unwrap(), None);
        assert!(ledger.applied_ordinals(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_last_applied_with_empty_table_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&temp_dir).await;
        create_ledger_table(&pool).await;
        let ledger = MigrationLedger::new(Dialect::SQLite);

        assert!(ledger.ledger_table_exists(&pool).await.unwrap());
        assert_eq!(ledger.last_applied(&pool).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_record_applied_then_last_applied() {
        let temp_dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&temp_dir).await;
        create_ledger_table(&pool).await;
        let ledger = MigrationLedger::new(Dialect::SQLite);

        let mut tx = pool.begin().await.unwrap();
        ledger.record_applied(&mut tx, 0).await.unwrap();
        ledger.record_applied(&mut tx, 1).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(ledger.last_applied(&pool).await.unwrap(), Some(1));
        assert_eq!(ledger.applied_ordinals(&pool).await.unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_record_applied_rolled_back_leaves_no_entry() {
        let temp_dir = TempDir::new().unwrap();
        let pool = sqlite_pool(&temp_dir).await;
        create_ledger_table(&pool).await;
        let ledger = MigrationLedger::new(Dialect::SQLite);

        let mut tx = pool.begin().await.unwrap();
        ledger.record_applied(&mut tx, 0).await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(ledger.last_applied(&pool).await.unwrap(), None);
    }
}
