// マイグレーションステップ定義
//
// ステップは番号（並び順）、説明、本体の3つで構成されます。
// 本体はランナーが開始したトランザクションの接続を StepContext 経由で受け取り、
// 自分でコミットやロールバックを行ってはいけません。

use crate::core::config::Dialect;
use crate::core::error::{DatabaseError, StepError};
use crate::services::step_services::StepServices;
use async_trait::async_trait;
use sqlx::{AnyConnection, Executor};
use tracing::debug;

/// ステップ本体のトレイト
#[async_trait]
pub trait MigrationStepBody: Send + Sync {
    /// ステップのトランザクション内で本体を実行
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError>;
}

/// 何もしないステップ本体
///
/// 台帳の番号だけを進めます。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

#[async_trait]
impl MigrationStepBody for NoOp {
    async fn run(&self, _ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        Ok(())
    }
}

/// マイグレーションステップ
pub struct MigrationStep {
    /// 0始まりのステップ番号
    pub ordinal: usize,
    /// ステップの説明
    pub description: String,
    body: Box<dyn MigrationStepBody>,
}

impl MigrationStep {
    /// ステップ本体への参照
    pub fn body(&self) -> &dyn MigrationStepBody {
        self.body.as_ref()
    }
}

impl std::fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationStep")
            .field("ordinal", &self.ordinal)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// 順序付きステップ列
///
/// 番号は追加順に 0, 1, 2, ... と割り当てられ、途中の抜けは起こりません。
#[derive(Debug, Default)]
pub struct Migrations {
    steps: Vec<MigrationStep>,
}

impl Migrations {
    /// 空のステップ列を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ステップを末尾に追加
    pub fn step(
        mut self,
        description: impl Into<String>,
        body: impl MigrationStepBody + 'static,
    ) -> Self {
        let ordinal = self.steps.len();
        self.steps.push(MigrationStep {
            ordinal,
            description: description.into(),
            body: Box::new(body),
        });
        self
    }

    /// 何もしないステップを末尾に追加
    pub fn noop(self, description: impl Into<String>) -> Self {
        self.step(description, NoOp)
    }

    /// ステップ数
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// ステップが空かどうか
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// ステップを順に走査
    pub fn iter(&self) -> impl Iterator<Item = &MigrationStep> {
        self.steps.iter()
    }

    /// 番号でステップを取得
    pub fn get(&self, ordinal: usize) -> Option<&MigrationStep> {
        self.steps.get(ordinal)
    }
}

/// ステップ実行コンテキスト
pub struct StepContext<'a> {
    conn: &'a mut AnyConnection,
    dialect: Dialect,
    services: &'a StepServices,
}

impl<'a> StepContext<'a> {
    /// 新しいStepContextを作成
    pub fn new(conn: &'a mut AnyConnection, dialect: Dialect, services: &'a StepServices) -> Self {
        Self {
            conn,
            dialect,
            services,
        }
    }

    /// トランザクションの接続
    pub fn connection(&mut self) -> &mut AnyConnection {
        self.conn
    }

    /// 対象データベースの方言
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// 外部依存
    pub fn services(&self) -> &'a StepServices {
        self.services
    }

    /// SQL文を1つ実行
    pub async fn execute(&mut self, sql: &str) -> Result<u64, StepError> {
        debug!(sql, "Executing statement");
        let result = Executor::execute(&mut *self.conn, sqlx::query(sql))
            .await
            .map_err(|e| DatabaseError::query(format!("Failed to execute SQL: {}", e), sql))?;
        Ok(result.rows_affected())
    }

    /// SQL文を順に実行
    pub async fn execute_all<I, S>(&mut self, statements: I) -> Result<(), StepError>
    where
        I: IntoIterator<Item = S> + Send,
        I::IntoIter: Send,
        S: AsRef<str> + Send,
    {
        for sql in statements {
            self.execute(sql.as_ref()).await?;
        }
        Ok(())
    }

    /// DDL文を順に実行
    ///
    /// MySQLのDDLは実行中のトランザクションを暗黙コミットするため、
    /// 後続の書き込みがロールバック可能になるようトランザクションを開き直します。
    /// START TRANSACTION 自体も暗黙コミットを伴うため、ステップ内の書き込みより前に呼ぶこと。
    pub async fn execute_ddl<I, S>(&mut self, statements: I) -> Result<(), StepError>
    where
        I: IntoIterator<Item = S> + Send,
        I::IntoIter: Send,
        S: AsRef<str> + Send,
    {
        self.execute_all(statements).await?;

        if self.dialect == Dialect::MySQL {
            // START TRANSACTION はプリペアドステートメントにできない
            Executor::execute(&mut *self.conn, sqlx::raw_sql("START TRANSACTION"))
                .await
                .map_err(|e| {
                    DatabaseError::query(
                        format!("Failed to reopen transaction after DDL: {}", e),
                        "START TRANSACTION",
                    )
                })?;
        }
        Ok(())
    }
}
