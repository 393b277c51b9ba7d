// コマンドハンドラー層
// 各CLIコマンドの実装

pub mod migrate;
pub mod status;
