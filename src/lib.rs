// broker-migrateライブラリのエントリーポイント
//
// モジュール構造:
// - cli: CLIレイヤー（ユーザー入力の受付とコマンドルーティング）
// - core: コアドメインモデル（設定、エラー、台帳とステップの型、サービス種別）
// - adapters: データベースとプロビジョニングAPIへのアクセスを抽象化
// - services: マイグレーションの実行とデータ変換

pub mod cli;
pub mod core;
pub mod adapters;
pub mod services;
