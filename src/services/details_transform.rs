// 詳細情報の変換
//
// provision_request_details の request_details を、サービス種別ごとの規則で
// service_instance_details.other_details へ書き写します。
// 1行でも失敗すればステップ全体が失敗し、書き換えはすべてロールバックされます。

use crate::core::config::Dialect;
use crate::core::error::{DatabaseError, LookupError, StepError};
use crate::core::migration::format_timestamp;
use crate::core::naming::{PROVISION_REQUEST_DETAILS_TABLE, SERVICE_INSTANCE_DETAILS_TABLE};
use crate::core::service::ServiceKind;
use crate::services::step::StepContext;
use crate::services::step_services::StepServices;
use chrono::Utc;
use sqlx::{AnyConnection, Row};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// 詳細情報blob（文字列値のみのJSONオブジェクト）
pub type Details = BTreeMap<String, String>;

/// プロビジョニングリクエスト行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub id: i64,
    pub service_instance_id: String,
    pub request_details: String,
}

/// サービスインスタンス行（変換に必要な列のみ）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    pub id: String,
    pub service_id: String,
}

/// プロビジョニングリクエストの詳細をサービスインスタンスへ書き写す
///
/// # Returns
///
/// 書き換えた行数
pub async fn copy_provision_request_details(ctx: &mut StepContext<'_>) -> Result<usize, StepError> {
    let dialect = ctx.dialect();
    let services = ctx.services();

    let requests = load_provision_requests(ctx.connection()).await?;
    debug!(count = requests.len(), "Loaded provision requests");

    for request in &requests {
        let instance =
            load_service_instance(ctx.connection(), dialect, &request.service_instance_id).await?;

        let source = parse_details(&request.service_instance_id, &request.request_details)?;
        let kind = services.resolve_service(&instance.service_id)?;
        let details = reshape_details(services, kind, &source).await?;

        let blob = serde_json::to_string(&details).map_err(|e| StepError::Serialize {
            message: e.to_string(),
        })?;
        update_other_details(ctx.connection(), dialect, &instance.id, &blob).await?;

        info!(instance = %instance.id, service = %kind, "Copied provision request details");
    }

    Ok(requests.len())
}

/// 詳細情報blobをパース
///
/// 文字列値のみのJSONオブジェクト以外はすべて不正とみなします。
pub fn parse_details(record: &str, blob: &str) -> Result<Details, StepError> {
    serde_json::from_str::<Details>(blob).map_err(|e| StepError::MalformedDetails {
        record: record.to_string(),
        message: e.to_string(),
    })
}

/// サービス種別ごとに引き継ぐキーを選ぶ
///
/// 元のblobに無いキーは空文字列として引き継ぎます。
/// Cloud SQL の host はここでは扱いません。
pub fn carry_fields(kind: ServiceKind, source: &Details) -> Details {
    let carried: &[(&str, &str)] = match kind {
        ServiceKind::CloudSqlMySql => &[
            ("instance_name", "instance_name"),
            ("database_name", "database_name"),
        ],
        ServiceKind::BigQuery => &[("dataset_id", "name")],
        ServiceKind::MlApis => &[],
        ServiceKind::Storage => &[("bucket_name", "name")],
        ServiceKind::PubSub => &[
            ("topic_name", "topic_name"),
            ("subscription_name", "subscription_name"),
        ],
    };

    carried
        .iter()
        .map(|(target, from)| {
            (
                target.to_string(),
                source.get(*from).cloned().unwrap_or_default(),
            )
        })
        .collect()
}

/// 新しい詳細情報を組み立てる
pub async fn reshape_details(
    services: &StepServices,
    kind: ServiceKind,
    source: &Details,
) -> Result<Details, StepError> {
    let mut details = carry_fields(kind, source);

    if kind == ServiceKind::CloudSqlMySql {
        let instance_name = source.get("instance_name").cloned().unwrap_or_default();
        let project_id = services.project_id()?;
        let descriptor = services
            .lookup_instance(&project_id, &instance_name)
            .await?;
        let host = descriptor
            .primary_address()
            .ok_or_else(|| LookupError::NoIpAddress {
                instance: instance_name.clone(),
            })?;
        details.insert("host".to_string(), host.to_string());
    }

    Ok(details)
}

async fn load_provision_requests(
    conn: &mut AnyConnection,
) -> Result<Vec<ProvisionRequest>, StepError> {
    let sql = format!(
        "SELECT id, service_instance_id, request_details FROM {} WHERE deleted_at IS NULL ORDER BY id",
        PROVISION_REQUEST_DETAILS_TABLE
    );

    let rows = sqlx::query(&sql).fetch_all(conn).await.map_err(|e| {
        DatabaseError::query(format!("Failed to read provision requests: {}", e), sql.clone())
    })?;

    rows.iter()
        .map(|row| {
            Ok(ProvisionRequest {
                id: row.try_get::<i64, _>("id")?,
                service_instance_id: row
                    .try_get::<Option<String>, _>("service_instance_id")?
                    .unwrap_or_default(),
                request_details: row
                    .try_get::<Option<String>, _>("request_details")?
                    .unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>, sqlx::Error>>()
        .map_err(|e| {
            DatabaseError::query(format!("Invalid provision request row: {}", e), sql).into()
        })
}

async fn load_service_instance(
    conn: &mut AnyConnection,
    dialect: Dialect,
    instance_id: &str,
) -> Result<ServiceInstance, StepError> {
    let sql = format!(
        "SELECT id, service_id FROM {} WHERE id = {} AND deleted_at IS NULL",
        SERVICE_INSTANCE_DETAILS_TABLE,
        dialect.placeholder(1)
    );

    let row = sqlx::query(&sql)
        .bind(instance_id.to_string())
        .fetch_optional(conn)
        .await
        .map_err(|e| {
            DatabaseError::query(format!("Failed to read service instance: {}", e), sql.clone())
        })?
        .ok_or_else(|| StepError::MissingRecord {
            table: SERVICE_INSTANCE_DETAILS_TABLE.to_string(),
            key: instance_id.to_string(),
        })?;

    let decode = |e: sqlx::Error| {
        DatabaseError::query(format!("Invalid service instance row: {}", e), sql.clone())
    };
    Ok(ServiceInstance {
        id: row.try_get::<String, _>("id").map_err(decode)?,
        service_id: row
            .try_get::<Option<String>, _>("service_id")
            .map_err(decode)?
            .unwrap_or_default(),
    })
}

/// other_details 更新SQLを生成
///
/// パラメータ順は other_details, updated_at, id です。
pub fn generate_update_other_details_sql(dialect: Dialect) -> String {
    format!(
        "UPDATE {} SET other_details = {}, updated_at = {} WHERE id = {}",
        SERVICE_INSTANCE_DETAILS_TABLE,
        dialect.placeholder(1),
        dialect.timestamp_placeholder(2),
        dialect.placeholder(3)
    )
}

async fn update_other_details(
    conn: &mut AnyConnection,
    dialect: Dialect,
    instance_id: &str,
    blob: &str,
) -> Result<(), StepError> {
    let sql = generate_update_other_details_sql(dialect);

    sqlx::query(&sql)
        .bind(blob.to_string())
        .bind(format_timestamp(&Utc::now()))
        .bind(instance_id.to_string())
        .execute(conn)
        .await
        .map_err(|e| {
            DatabaseError::query(format!("Failed to update service instance: {}", e), sql)
        })?;

    Ok(())
}
