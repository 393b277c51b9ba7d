// 命名ポリシー
//
// アプリケーション名、設定ファイル名、ブローカーDBのテーブル名の単一ソースを提供します。

/// 現行アプリケーション名
pub const APP_NAME: &str = "broker-migrate";

/// 既定の設定ファイル名
pub const CONFIG_FILE: &str = ".broker-migrate.yaml";

/// マイグレーション台帳テーブル
pub const LEDGER_TABLE: &str = "migrations";

/// サービスインスタンス詳細テーブル
pub const SERVICE_INSTANCE_DETAILS_TABLE: &str = "service_instance_details";

/// サービスバインディング認証情報テーブル
pub const SERVICE_BINDING_CREDENTIALS_TABLE: &str = "service_binding_credentials";

/// プロビジョニングリクエスト詳細テーブル
pub const PROVISION_REQUEST_DETAILS_TABLE: &str = "provision_request_details";

/// プラン詳細テーブル
pub const PLAN_DETAILS_TABLE: &str = "plan_details";

/// クラウドオペレーションテーブル
pub const CLOUD_OPERATIONS_TABLE: &str = "cloud_operations";

/// サービスアカウントJSONを保持する環境変数
pub const SERVICE_ACCOUNT_ENV: &str = "ROOT_SERVICE_ACCOUNT_JSON";
