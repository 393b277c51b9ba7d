// サービスカタログ
//
// ブローカーに登録されたサービスIDとサービス名の対応表。
// サービス名から変換種別（ServiceKind）を決定します。

use crate::core::error::CatalogError;
use crate::core::service::ServiceKind;
use crate::services::traits::ServiceResolver;
use std::collections::BTreeMap;

/// ブローカーの標準サービスID
const BUILTIN_SERVICES: [(&str, &str); 6] = [
    ("4bc59b9a-8520-409f-85da-1c7552315863", "google-cloudsql-mysql"),
    ("cbad6d78-a73c-432d-b8ff-b219a17a803a", "google-cloudsql-postgres"),
    ("f80c0a3e-bd4d-4809-a900-b4e33a6450f1", "google-bigquery"),
    ("5ad2dce0-51f7-4ede-8b46-293d6df1e8d4", "google-ml-apis"),
    ("b9e4332e-b42b-4680-bda5-ea1506797474", "google-storage"),
    ("628629e3-79f5-4255-b981-d14c6c7856be", "google-pubsub"),
];

/// サービスカタログ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    entries: BTreeMap<String, String>,
}

impl ServiceCatalog {
    /// 空のカタログを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 標準サービスを登録したカタログを作成
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for (id, name) in BUILTIN_SERVICES {
            catalog.insert(id, name);
        }
        catalog
    }

    /// エントリを追加（既存のIDは上書き）
    pub fn insert(&mut self, service_id: impl Into<String>, service_name: impl Into<String>) {
        self.entries.insert(service_id.into(), service_name.into());
    }

    /// 複数のエントリで追加・上書きする
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (id, name) in overrides {
            self.insert(id.clone(), name.clone());
        }
        self
    }

    /// サービス名を取得
    pub fn service_name(&self, service_id: &str) -> Option<&str> {
        self.entries.get(service_id).map(String::as_str)
    }

    /// 登録済みのエントリ数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// カタログが空かどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ServiceResolver for ServiceCatalog {
    fn resolve(&self, service_id: &str) -> Result<ServiceKind, CatalogError> {
        let service_name =
            self.service_name(service_id)
                .ok_or_else(|| CatalogError::UnknownServiceId {
                    service_id: service_id.to_string(),
                })?;

        service_name
            .parse::<ServiceKind>()
            .map_err(|service_name| CatalogError::UnsupportedService {
                service_id: service_id.to_string(),
                service_name,
            })
    }
}
