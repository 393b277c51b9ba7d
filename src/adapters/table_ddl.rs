// テーブルDDL生成アダプター
//
// ブローカーDBのテーブル定義から各データベース方言用のCREATE TABLE文を生成します。
// すべての文は IF NOT EXISTS 付きで、DDLが暗黙コミットされるMySQLで
// 前回の実行が台帳記録前に失敗していても再実行できるようにしています。

use crate::core::config::Dialect;

/// 主キーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColumn {
    /// 文字列の主キー（外部から払い出されたID）
    Text,
    /// 自動採番の整数主キー
    Serial,
}

/// カラム型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// varchar(255)
    Varchar,
    /// text
    Text,
    /// 整数
    Integer,
}

/// テーブル定義
///
/// 全テーブルに created_at / updated_at / deleted_at が付与されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    /// テーブル名
    pub name: &'static str,
    /// 主キーの種類
    pub key: KeyColumn,
    /// 主キーと日時カラム以外のカラム
    pub columns: &'static [(&'static str, ColumnType)],
    /// deleted_at にインデックスを張るか
    pub index_deleted_at: bool,
}

/// テーブルDDL生成器
#[derive(Debug, Clone)]
pub struct TableDdlGenerator {
    dialect: Dialect,
}

impl TableDdlGenerator {
    /// 新しいTableDdlGeneratorを作成
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// CREATE TABLE文（と必要ならCREATE INDEX文）を生成
    ///
    /// # Returns
    ///
    /// 実行順に並んだSQL文のリスト
    pub fn generate_create_table(&self, table: &TableDefinition) -> Vec<String> {
        let mut lines = vec![self.key_definition(table.key)];
        for column in ["created_at", "updated_at", "deleted_at"] {
            lines.push(format!("{} timestamp NULL DEFAULT NULL", column));
        }
        for (name, column_type) in table.columns {
            lines.push(format!("{} {}", name, self.column_type(*column_type)));
        }

        let index_name = format!("idx_{}_deleted_at", table.name);
        if table.key == KeyColumn::Text || self.dialect == Dialect::MySQL {
            lines.push("PRIMARY KEY (id)".to_string());
        }
        if table.index_deleted_at && self.dialect == Dialect::MySQL {
            lines.push(format!("KEY {} (deleted_at)", index_name));
        }

        let suffix = match self.dialect {
            Dialect::MySQL => " ENGINE=InnoDB DEFAULT CHARSET=utf8",
            Dialect::PostgreSQL | Dialect::SQLite => "",
        };

        let mut statements = vec![format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  {}\n){}",
            table.name,
            lines.join(",\n  "),
            suffix
        )];

        // MySQLはCREATE INDEX IF NOT EXISTSをサポートしないためテーブル定義内に含める
        if table.index_deleted_at && self.dialect != Dialect::MySQL {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} (deleted_at)",
                index_name, table.name
            ));
        }

        statements
    }

    fn key_definition(&self, key: KeyColumn) -> String {
        match (key, self.dialect) {
            (KeyColumn::Text, _) => "id varchar(255) NOT NULL DEFAULT ''".to_string(),
            (KeyColumn::Serial, Dialect::MySQL) => {
                "id int(10) unsigned NOT NULL AUTO_INCREMENT".to_string()
            }
            (KeyColumn::Serial, Dialect::PostgreSQL) => "id SERIAL PRIMARY KEY".to_string(),
            (KeyColumn::Serial, Dialect::SQLite) => {
                "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()
            }
        }
    }

    fn column_type(&self, column_type: ColumnType) -> &'static str {
        match (column_type, self.dialect) {
            (ColumnType::Varchar, _) => "varchar(255) DEFAULT NULL",
            (ColumnType::Text, _) => "text",
            (ColumnType::Integer, Dialect::MySQL) => "int(10) DEFAULT NULL",
            (ColumnType::Integer, _) => "integer DEFAULT NULL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATIONS: TableDefinition = TableDefinition {
        name: "operations",
        key: KeyColumn::Serial,
        columns: &[("name", ColumnType::Varchar), ("error_message", ColumnType::Text)],
        index_deleted_at: true,
    };

    const DETAILS: TableDefinition = TableDefinition {
        name: "details",
        key: KeyColumn::Text,
        columns: &[("other_details", ColumnType::Text)],
        index_deleted_at: false,
    };

    #[test]
    fn test_generate_create_table_mysql() {
        let statements = TableDdlGenerator::new(Dialect::MySQL).generate_create_table(&OPERATIONS);

        assert_eq!(statements.len(), 1);
        let sql = &statements[0];
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS operations ("));
        assert!(sql.contains("id int(10) unsigned NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("PRIMARY KEY (id)"));
        assert!(sql.contains("KEY idx_operations_deleted_at (deleted_at)"));
        assert!(sql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8"));
    }

    #[test]
    fn test_generate_create_table_postgres() {
        let statements =
            TableDdlGenerator::new(Dialect::PostgreSQL).generate_create_table(&OPERATIONS);

        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("id SERIAL PRIMARY KEY"));
        assert!(!statements[0].contains("PRIMARY KEY (id)"));
        assert!(!statements[0].contains("ENGINE"));
        assert_eq!(
            statements[1],
            "CREATE INDEX IF NOT EXISTS idx_operations_deleted_at ON operations (deleted_at)"
        );
    }

    #[test]
    fn test_generate_create_table_sqlite_text_key() {
        let statements = TableDdlGenerator::new(Dialect::SQLite).generate_create_table(&DETAILS);

        assert_eq!(statements.len(), 1);
        let sql = &statements[0];
        assert!(sql.contains("id varchar(255) NOT NULL DEFAULT ''"));
        assert!(sql.contains("PRIMARY KEY (id)"));
        assert!(sql.contains("deleted_at timestamp NULL DEFAULT NULL"));
        assert!(sql.contains("other_details text"));
    }

    #[test]
    fn test_integer_column_type_by_dialect() {
        assert_eq!(
            TableDdlGenerator::new(Dialect::MySQL).column_type(ColumnType::Integer),
            "int(10) DEFAULT NULL"
        );
        assert_eq!(
            TableDdlGenerator::new(Dialect::SQLite).column_type(ColumnType::Integer),
            "integer DEFAULT NULL"
        );
    }
}
