// ステップサービス
//
// ステップ本体に渡される外部依存の束。
// プロビジョニングAPI呼び出しには必ず期限が付きます。

use crate::core::error::{CatalogError, LookupError};
use crate::core::naming::SERVICE_ACCOUNT_ENV;
use crate::core::service::{InstanceDescriptor, ServiceKind};
use crate::services::traits::{ProvisioningLookup, ServiceResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// 既定の外部呼び出し期限
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// プロジェクトIDの取得元
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectIdSource {
    /// 設定で指定された値
    Fixed(String),
    /// 環境変数に格納されたサービスアカウントJSONの project_id
    ServiceAccountEnv(String),
}

impl ProjectIdSource {
    /// プロジェクトIDを解決
    pub fn resolve(&self) -> Result<String, LookupError> {
        match self {
            ProjectIdSource::Fixed(project_id) => Ok(project_id.clone()),
            ProjectIdSource::ServiceAccountEnv(var) => {
                let json = std::env::var(var).map_err(|_| LookupError::ProjectId {
                    message: format!("environment variable {} is not set", var),
                })?;
                project_id_from_service_account(&json)
            }
        }
    }
}

impl Default for ProjectIdSource {
    fn default() -> Self {
        ProjectIdSource::ServiceAccountEnv(SERVICE_ACCOUNT_ENV.to_string())
    }
}

/// サービスアカウントJSONから project_id を取り出す
pub fn project_id_from_service_account(json: &str) -> Result<String, LookupError> {
    let account: HashMap<String, serde_json::Value> =
        serde_json::from_str(json).map_err(|e| LookupError::ProjectId {
            message: format!("Could not unmarshal service account details. {}", e),
        })?;

    match account.get("project_id").and_then(|v| v.as_str()) {
        Some(project_id) if !project_id.is_empty() => Ok(project_id.to_string()),
        _ => Err(LookupError::ProjectId {
            message: "service account details have no project_id".to_string(),
        }),
    }
}

/// プロビジョニングAPIが設定されていない場合の参照
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredLookup;

#[async_trait]
impl ProvisioningLookup for UnconfiguredLookup {
    async fn get_instance(
        &self,
        _project_id: &str,
        _instance_name: &str,
    ) -> Result<InstanceDescriptor, LookupError> {
        Err(LookupError::NotConfigured)
    }
}

/// ステップ本体に渡される外部依存
#[derive(Clone)]
pub struct StepServices {
    lookup: Arc<dyn ProvisioningLookup>,
    resolver: Arc<dyn ServiceResolver>,
    project_id: ProjectIdSource,
    lookup_timeout: Duration,
}

impl StepServices {
    /// 新しいStepServicesを作成
    pub fn new(lookup: Arc<dyn ProvisioningLookup>, resolver: Arc<dyn ServiceResolver>) -> Self {
        Self {
            lookup,
            resolver,
            project_id: ProjectIdSource::default(),
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    /// 外部参照を行わないStepServicesを作成
    pub fn offline(resolver: Arc<dyn ServiceResolver>) -> Self {
        Self::new(Arc::new(UnconfiguredLookup), resolver)
    }

    /// プロジェクトIDを固定する
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = ProjectIdSource::Fixed(project_id.into());
        self
    }

    /// プロジェクトIDの取得元を指定する
    pub fn with_project_id_source(mut self, source: ProjectIdSource) -> Self {
        self.project_id = source;
        self
    }

    /// 外部呼び出し期限を指定する
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// 外部呼び出し期限
    pub fn lookup_timeout(&self) -> Duration {
        self.lookup_timeout
    }

    /// サービスIDから変換種別を解決
    pub fn resolve_service(&self, service_id: &str) -> Result<ServiceKind, CatalogError> {
        self.resolver.resolve(service_id)
    }

    /// プロジェクトIDを取得
    pub fn project_id(&self) -> Result<String, LookupError> {
        self.project_id.resolve()
    }

    /// 期限付きでインスタンス記述子を取得
    pub async fn lookup_instance(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<InstanceDescriptor, LookupError> {
        debug!(project_id, instance_name, "Looking up instance");
        tokio::time::timeout(
            self.lookup_timeout,
            self.lookup.get_instance(project_id, instance_name),
        )
        .await
        .map_err(|_| LookupError::Timeout {
            instance: instance_name.to_string(),
            timeout_secs: self.lookup_timeout.as_secs(),
        })?
    }
}

impl std::fmt::Debug for StepServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepServices")
            .field("project_id", &self.project_id)
            .field("lookup_timeout", &self.lookup_timeout)
            .finish_non_exhaustive()
    }
}
