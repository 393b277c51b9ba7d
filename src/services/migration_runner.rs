// マイグレーションランナー
//
// 台帳の最終適用番号の次から、ステップを番号順に1つずつ実行します。
// 1ステップ = 1トランザクションで、ステップ本体と台帳記録を同じトランザクションで
// コミットします。最初の失敗でロールバックし、以降のステップは実行しません。

use crate::adapters::migration_ledger::MigrationLedger;
use crate::core::config::Dialect;
use crate::core::error::{DatabaseError, MigrationError, StepError};
use crate::core::migration::{is_contiguous, AppliedStep, MigrationStatus, RunSummary};
use crate::services::step::{MigrationStep, Migrations, StepContext};
use crate::services::step_services::StepServices;
use chrono::Utc;
use sqlx::AnyPool;
use tracing::{debug, error, info, warn};

/// マイグレーションランナー
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    pool: AnyPool,
    dialect: Dialect,
    ledger: MigrationLedger,
    services: StepServices,
}

impl MigrationRunner {
    /// 新しいMigrationRunnerを作成
    pub fn new(pool: AnyPool, dialect: Dialect, services: StepServices) -> Self {
        Self {
            pool,
            dialect,
            ledger: MigrationLedger::new(dialect),
            services,
        }
    }

    /// 台帳
    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// 未適用のステップをすべて実行
    ///
    /// # Returns
    ///
    /// 成功時は今回適用したステップの一覧。失敗時は失敗したステップと原因。
    /// 失敗したステップの変更と台帳記録はロールバック済みで、
    /// それ以前に適用したステップはコミット済みのまま残ります。
    pub async fn run(&self, migrations: &Migrations) -> Result<RunSummary, MigrationError> {
        let previous = self
            .ledger
            .last_applied(&self.pool)
            .await
            .map_err(MigrationError::LedgerRead)?;

        let start = next_ordinal(previous);
        info!(
            last_applied = ?previous,
            start,
            total = migrations.len(),
            "Starting migrations"
        );

        if start > migrations.len() {
            warn!(
                last_applied = ?previous,
                known = migrations.len(),
                "Ledger is ahead of the known migrations; nothing to run"
            );
        }

        let mut applied = Vec::new();
        for step in migrations.iter().skip(start) {
            let started_at = Utc::now();
            info!(index = step.ordinal, description = %step.description, "Applying migration");

            if let Err(source) = self.apply_step(step).await {
                error!(
                    index = step.ordinal,
                    description = %step.description,
                    error = %source,
                    "Migration failed"
                );
                return Err(MigrationError::Step {
                    index: step.ordinal,
                    description: step.description.clone(),
                    source,
                });
            }

            let applied_at = Utc::now();
            let duration = applied_at.signed_duration_since(started_at);
            info!(
                index = step.ordinal,
                duration_ms = duration.num_milliseconds(),
                "Migration applied"
            );
            applied.push(AppliedStep::new(
                step.ordinal,
                step.description.clone(),
                applied_at,
                duration,
            ));
        }

        let last_applied = applied
            .last()
            .map(|step| step.index as i64)
            .or(previous);

        if applied.is_empty() {
            info!(last_applied = ?last_applied, "Database is up to date");
        }

        Ok(RunSummary {
            previous,
            applied,
            last_applied,
        })
    }

    /// 台帳とステップ一覧を突き合わせる（何も実行しない）
    pub async fn status(&self, migrations: &Migrations) -> Result<MigrationStatus, MigrationError> {
        let applied = self
            .ledger
            .applied_ordinals(&self.pool)
            .await
            .map_err(MigrationError::LedgerRead)?;

        let last_applied = applied.iter().copied().max();
        let start = next_ordinal(last_applied);
        let pending = migrations
            .iter()
            .map(|step| step.ordinal)
            .filter(|ordinal| *ordinal >= start)
            .collect();

        Ok(MigrationStatus {
            last_applied,
            contiguous: is_contiguous(&applied),
            applied,
            pending,
        })
    }

    /// 1ステップを1トランザクションで実行
    async fn apply_step(&self, step: &MigrationStep) -> Result<(), StepError> {
        let mut tx = self.pool.begin().await.map_err(|e| DatabaseError::Transaction {
            message: format!("Failed to start transaction: {}", e),
        })?;

        let result = async {
            let mut ctx = StepContext::new(&mut tx, self.dialect, &self.services);
            step.body().run(&mut ctx).await?;
            self.ledger
                .record_applied(&mut tx, step.ordinal as i64)
                .await
                .map_err(StepError::LedgerWrite)
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await.map_err(|e| DatabaseError::Transaction {
                    message: format!("Failed to commit transaction: {}", e),
                })?;
                Ok(())
            }
            Err(e) => {
                debug!(index = step.ordinal, "Rolling back migration");
                if let Err(rollback_error) = tx.rollback().await {
                    warn!(
                        index = step.ordinal,
                        error = %rollback_error,
                        "Failed to roll back transaction"
                    );
                }
                Err(e)
            }
        }
    }
}

/// 最終適用番号から次に実行するステップ番号を求める
fn next_ordinal(last_applied: Option<i64>) -> usize {
    match last_applied {
        Some(last) if last >= 0 => last as usize + 1,
        _ => 0,
    }
}
