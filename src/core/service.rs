// サービス種別とプロビジョニング記述子
//
// 行に保存されたサービスIDから決まる変換種別と、
// プロビジョニングAPIが返すインスタンス記述子を表現します。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 変換対象のサービス種別
///
/// 各種別は詳細情報blobのキーを互いに素な集合へ写像します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceKind {
    /// Cloud SQL (MySQL)
    CloudSqlMySql,
    /// BigQuery
    BigQuery,
    /// ML APIs
    MlApis,
    /// Cloud Storage
    Storage,
    /// Pub/Sub
    PubSub,
}

impl ServiceKind {
    /// 全種別
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::CloudSqlMySql,
        ServiceKind::BigQuery,
        ServiceKind::MlApis,
        ServiceKind::Storage,
        ServiceKind::PubSub,
    ];

    /// ブローカーに登録されたサービス名
    pub fn service_name(&self) -> &'static str {
        match self {
            ServiceKind::CloudSqlMySql => "google-cloudsql-mysql",
            ServiceKind::BigQuery => "google-bigquery",
            ServiceKind::MlApis => "google-ml-apis",
            ServiceKind::Storage => "google-storage",
            ServiceKind::PubSub => "google-pubsub",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.service_name())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.service_name() == name)
            .ok_or_else(|| name.to_string())
    }
}

/// プロビジョニングAPIが返すインスタンス記述子
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    /// インスタンス名
    #[serde(default)]
    pub name: String,

    /// 割り当てられたIPアドレス
    #[serde(default)]
    pub ip_addresses: Vec<IpMapping>,
}

impl InstanceDescriptor {
    /// 最初に割り当てられたIPアドレス
    pub fn primary_address(&self) -> Option<&str> {
        self.ip_addresses
            .first()
            .map(|mapping| mapping.ip_address.as_str())
    }
}

/// IPアドレスの割り当て
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpMapping {
    /// IPアドレス
    pub ip_address: String,

    /// 割り当て種別（PRIMARY, PRIVATE など）
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
