// サービストレイト定義
//
// データ変換ステップが呼び出す外部依存のインターフェース。
// テスト時のモック差し替えを可能にするため、トレイトとして抽象化します。

use crate::core::error::{CatalogError, LookupError};
use crate::core::service::{InstanceDescriptor, ServiceKind};
use async_trait::async_trait;

/// プロビジョニングAPI参照のトレイト
#[async_trait]
pub trait ProvisioningLookup: Send + Sync {
    /// プロジェクトIDとインスタンス名からインスタンス記述子を取得
    async fn get_instance(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<InstanceDescriptor, LookupError>;
}

/// サービス種別解決のトレイト
pub trait ServiceResolver: Send + Sync {
    /// 行に保存されたサービスIDから変換種別を解決
    ///
    /// 未知のIDはエラーとし、黙ってスキップすることはしない。
    fn resolve(&self, service_id: &str) -> Result<ServiceKind, CatalogError>;
}
