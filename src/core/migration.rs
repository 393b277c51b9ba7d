// マイグレーションドメインモデル
//
// 台帳の記録、適用済みステップ、実行結果、ステータスを表現する型。
// ステップ本体（実行可能な処理）は services::step に置き、ここは純粋なデータのみを扱います。

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 台帳エントリ
///
/// migrationsテーブルの1行に対応します。
/// 1ステップにつき1回だけ作成され、更新・削除はされません。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// ステップ番号
    pub migration_id: i64,

    /// 記録日時
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// 新しい台帳エントリを作成
    pub fn new(migration_id: i64) -> Self {
        Self {
            migration_id,
            created_at: Utc::now(),
        }
    }

    /// 台帳の日時カラムに書き込む形式
    ///
    /// PostgreSQLでは Dialect::timestamp_placeholder によるキャストと組み合わせます。
    pub fn timestamp_literal(&self) -> String {
        format_timestamp(&self.created_at)
    }
}

/// 日時をtimestampカラム用の文字列に変換
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 台帳の番号が 0..=k の連続した前置列になっているか
pub fn is_contiguous(ordinals: &[i64]) -> bool {
    ordinals
        .iter()
        .enumerate()
        .all(|(position, ordinal)| *ordinal == position as i64)
}

/// 適用済みステップ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedStep {
    /// ステップ番号
    pub index: usize,

    /// ステップの説明
    pub description: String,

    /// 適用日時
    pub applied_at: DateTime<Utc>,

    /// 実行にかかった時間
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl AppliedStep {
    /// 新しい適用済みステップを作成
    pub fn new(
        index: usize,
        description: String,
        applied_at: DateTime<Utc>,
        duration: Duration,
    ) -> Self {
        Self {
            index,
            description,
            applied_at,
            duration,
        }
    }
}

// chronoのDurationをミリ秒でシリアライズ/デシリアライズするためのヘルパー
mod duration_millis {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(millis))
    }
}

/// マイグレーション実行結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// 実行開始時の最終適用番号
    pub previous: Option<i64>,

    /// 今回適用したステップ
    pub applied: Vec<AppliedStep>,

    /// 実行後の最終適用番号
    pub last_applied: Option<i64>,
}

impl RunSummary {
    /// 何も適用しなかったかどうか
    pub fn is_up_to_date(&self) -> bool {
        self.applied.is_empty()
    }

    /// 合計実行時間
    pub fn total_duration(&self) -> Duration {
        self.applied
            .iter()
            .fold(Duration::zero(), |acc, step| acc + step.duration)
    }

    /// テキスト形式のサマリー
    pub fn render(&self) -> String {
        if self.applied.is_empty() {
            return format!(
                "Database is up to date (last applied: {})",
                format_ordinal(self.last_applied)
            );
        }

        let mut output = format!("{} migration(s) applied:\n", self.applied.len());
        for step in &self.applied {
            output.push_str(&format!(
                "  {} {} ({}ms)\n",
                step.index,
                step.description,
                step.duration.num_milliseconds()
            ));
        }
        output.push_str(&format!(
            "Total: {}ms, last applied: {}",
            self.total_duration().num_milliseconds(),
            format_ordinal(self.last_applied)
        ));
        output
    }
}

/// マイグレーションステータス
///
/// 何も実行せずに台帳とステップ一覧を突き合わせた結果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// 最終適用番号
    pub last_applied: Option<i64>,

    /// 台帳に記録された番号
    pub applied: Vec<i64>,

    /// 未適用のステップ番号
    pub pending: Vec<usize>,

    /// 台帳が連続しているか
    pub contiguous: bool,
}

impl MigrationStatus {
    /// テキスト形式のステータス
    pub fn render(&self) -> String {
        let mut output = format!("Last applied: {}\n", format_ordinal(self.last_applied));
        output.push_str(&format!("Applied: {} step(s)\n", self.applied.len()));
        if self.pending.is_empty() {
            output.push_str("Pending: none");
        } else {
            let pending: Vec<String> = self.pending.iter().map(|i| i.to_string()).collect();
            output.push_str(&format!("Pending: {}", pending.join(", ")));
        }
        if !self.contiguous {
            output.push_str("\nWarning: ledger has gaps");
        }
        output
    }
}

fn format_ordinal(ordinal: Option<i64>) -> String {
    ordinal.map_or_else(|| "none".to_string(), |i| i.to_string())
}
