// 接続文字列ビルダー
//
// DatabaseConfig と Dialect から接続文字列を生成する。
// ユーザー名とパスワードはURLエンコードして埋め込みます。

use crate::core::config::{DatabaseConfig, Dialect};

/// 接続文字列を生成
pub fn build_connection_string(dialect: Dialect, config: &DatabaseConfig) -> String {
    match dialect {
        Dialect::PostgreSQL => format!(
            "postgresql://{}@{}:{}/{}",
            credentials(config, "postgres"),
            config.host,
            config.port,
            config.database
        ),
        Dialect::MySQL => format!(
            "mysql://{}@{}:{}/{}",
            credentials(config, "root"),
            config.host,
            config.port,
            config.database
        ),
        Dialect::SQLite => format!("sqlite://{}?mode=rwc", config.database),
    }
}

fn credentials(config: &DatabaseConfig, default_user: &str) -> String {
    let user = urlencoding::encode(config.user.as_deref().unwrap_or(default_user));
    match config.password.as_deref() {
        Some(password) if !password.is_empty() => {
            format!("{}:{}", user, urlencoding::encode(password))
        }
        _ => user.into_owned(),
    }
}
