// プロビジョニングAPIクライアント
//
// Cloud SQL Admin API 互換のエンドポイントからインスタンス記述子を取得します。
// 取得に失敗した場合のエラーは加工せずにステップの失敗として伝播されます。

use crate::core::config::ProvisioningConfig;
use crate::core::error::LookupError;
use crate::core::service::InstanceDescriptor;
use crate::services::traits::ProvisioningLookup;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Cloud SQL Admin APIクライアント
#[derive(Debug, Clone)]
pub struct CloudSqlAdminClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl CloudSqlAdminClient {
    /// 設定からクライアントを作成
    ///
    /// HTTPリクエスト自体にも設定のタイムアウトを適用します。
    pub fn new(config: &ProvisioningConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LookupError::Transport {
                message: format!("Error creating new CloudSQL Client: {}", e),
            })?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// インスタンス取得URLを生成
    pub fn instance_url(&self, project_id: &str, instance_name: &str) -> String {
        format!(
            "{}/sql/v1beta4/projects/{}/instances/{}",
            self.endpoint,
            urlencoding::encode(project_id),
            urlencoding::encode(instance_name)
        )
    }
}

#[async_trait]
impl ProvisioningLookup for CloudSqlAdminClient {
    async fn get_instance(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<InstanceDescriptor, LookupError> {
        let url = self.instance_url(project_id, instance_name);
        debug!(%url, "Fetching instance from provisioning api");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| LookupError::Transport {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.map_err(|e| LookupError::Transport {
                message: format!("failed to read error response ({}): {}", status, e),
            })?;
            return Err(LookupError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<InstanceDescriptor>()
            .await
            .map_err(|e| LookupError::Decode {
                message: e.to_string(),
            })
    }
}
