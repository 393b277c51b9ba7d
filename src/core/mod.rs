// Core Domain
// 設定、エラー、台帳・実行結果、サービス種別といった純粋なドメイン型

pub mod config;
pub mod error;
pub mod migration;
pub mod naming;
pub mod service;
