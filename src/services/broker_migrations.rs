// ブローカーDBのマイグレーション一覧
//
// リリース済みのステップ列。ステップは末尾への追加のみ可能で、
// 既存ステップの順序や内容を変えてはいけません。

use crate::adapters::migration_ledger::LEDGER_TABLE_DEFINITION;
use crate::adapters::table_ddl::{ColumnType, KeyColumn, TableDdlGenerator, TableDefinition};
use crate::core::error::StepError;
use crate::core::naming::{
    CLOUD_OPERATIONS_TABLE, PLAN_DETAILS_TABLE, PROVISION_REQUEST_DETAILS_TABLE,
    SERVICE_BINDING_CREDENTIALS_TABLE, SERVICE_INSTANCE_DETAILS_TABLE,
};
use crate::services::details_transform::copy_provision_request_details;
use crate::services::step::{MigrationStepBody, Migrations, StepContext};
use async_trait::async_trait;
use tracing::info;

/// service_instance_details
pub const SERVICE_INSTANCE_DETAILS: TableDefinition = TableDefinition {
    name: SERVICE_INSTANCE_DETAILS_TABLE,
    key: KeyColumn::Text,
    columns: &[
        ("name", ColumnType::Varchar),
        ("location", ColumnType::Varchar),
        ("url", ColumnType::Varchar),
        ("other_details", ColumnType::Text),
        ("service_id", ColumnType::Varchar),
        ("plan_id", ColumnType::Varchar),
        ("space_guid", ColumnType::Varchar),
        ("organization_guid", ColumnType::Varchar),
    ],
    index_deleted_at: false,
};

/// service_binding_credentials
pub const SERVICE_BINDING_CREDENTIALS: TableDefinition = TableDefinition {
    name: SERVICE_BINDING_CREDENTIALS_TABLE,
    key: KeyColumn::Serial,
    columns: &[
        ("other_details", ColumnType::Text),
        ("service_id", ColumnType::Varchar),
        ("service_instance_id", ColumnType::Varchar),
        ("binding_id", ColumnType::Varchar),
    ],
    index_deleted_at: true,
};

/// provision_request_details
pub const PROVISION_REQUEST_DETAILS: TableDefinition = TableDefinition {
    name: PROVISION_REQUEST_DETAILS_TABLE,
    key: KeyColumn::Serial,
    columns: &[
        ("service_instance_id", ColumnType::Varchar),
        ("request_details", ColumnType::Varchar),
    ],
    index_deleted_at: true,
};

/// plan_details
pub const PLAN_DETAILS: TableDefinition = TableDefinition {
    name: PLAN_DETAILS_TABLE,
    key: KeyColumn::Text,
    columns: &[
        ("service_id", ColumnType::Varchar),
        ("name", ColumnType::Varchar),
        ("features", ColumnType::Text),
    ],
    index_deleted_at: false,
};

/// cloud_operations
pub const CLOUD_OPERATIONS: TableDefinition = TableDefinition {
    name: CLOUD_OPERATIONS_TABLE,
    key: KeyColumn::Serial,
    columns: &[
        ("name", ColumnType::Varchar),
        ("status", ColumnType::Varchar),
        ("operation_type", ColumnType::Varchar),
        ("error_message", ColumnType::Text),
        ("insert_time", ColumnType::Varchar),
        ("start_time", ColumnType::Varchar),
        ("target_id", ColumnType::Varchar),
        ("target_link", ColumnType::Varchar),
        ("service_id", ColumnType::Varchar),
        ("service_instance_id", ColumnType::Varchar),
    ],
    index_deleted_at: false,
};

/// テーブルを順に作成するステップ本体
#[derive(Debug, Clone)]
pub struct CreateTables {
    tables: Vec<TableDefinition>,
}

impl CreateTables {
    /// 新しいCreateTablesを作成
    pub fn new(tables: Vec<TableDefinition>) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl MigrationStepBody for CreateTables {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        create_tables(ctx, &self.tables).await
    }
}

/// cloud_operations を作成し、プロビジョニング詳細を書き写すステップ本体
#[derive(Debug, Clone, Copy, Default)]
pub struct AddCloudOperations;

#[async_trait]
impl MigrationStepBody for AddCloudOperations {
    async fn run(&self, ctx: &mut StepContext<'_>) -> Result<(), StepError> {
        create_tables(ctx, &[CLOUD_OPERATIONS]).await?;
        let copied = copy_provision_request_details(ctx).await?;
        info!(rows = copied, "Provision request details copied");
        Ok(())
    }
}

async fn create_tables(
    ctx: &mut StepContext<'_>,
    tables: &[TableDefinition],
) -> Result<(), StepError> {
    let generator = TableDdlGenerator::new(ctx.dialect());
    for table in tables {
        ctx.execute_ddl(generator.generate_create_table(table))
            .await?;
    }
    Ok(())
}

/// ブローカーDBのステップ列
pub fn broker_migrations() -> Migrations {
    Migrations::new()
        .step(
            "create broker tables",
            CreateTables::new(vec![
                SERVICE_INSTANCE_DETAILS,
                SERVICE_BINDING_CREDENTIALS,
                PROVISION_REQUEST_DETAILS,
                PLAN_DETAILS,
                LEDGER_TABLE_DEFINITION,
            ]),
        )
        .step(
            "add cloud operations and copy provision request details",
            AddCloudOperations,
        )
        // plan_details は残す
        .noop("keep plan details")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Dialect;

    #[test]
    fn test_broker_migrations_order() {
        let migrations = broker_migrations();
        let descriptions: Vec<&str> = migrations
            .iter()
            .map(|step| step.description.as_str())
            .collect();

        assert_eq!(
            descriptions,
            vec![
                "create broker tables",
                "add cloud operations and copy provision request details",
                "keep plan details",
            ]
        );
    }

    #[test]
    fn test_mysql_ddl_matches_broker_schema() {
        let generator = TableDdlGenerator::new(Dialect::MySQL);
        let statements = generator.generate_create_table(&PROVISION_REQUEST_DETAILS);

        assert_eq!(statements.len(), 1);
        let sql = &statements[0];
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS provision_request_details"));
        assert!(sql.contains("id int(10) unsigned NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("request_details varchar(255) DEFAULT NULL"));
        assert!(sql.contains("KEY idx_provision_request_details_deleted_at (deleted_at)"));
    }

    #[test]
    fn test_sqlite_ddl_for_text_key_table() {
        let generator = TableDdlGenerator::new(Dialect::SQLite);
        let statements = generator.generate_create_table(&SERVICE_INSTANCE_DETAILS);

        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("id varchar(255) NOT NULL DEFAULT ''"));
        assert!(statements[0].contains("other_details text"));
        assert!(!statements[0].contains("ENGINE"));
    }
}
