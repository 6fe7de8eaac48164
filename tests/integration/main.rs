// 統合テスト - ライブラリ全体と driver バイナリを実ファイルで検証する

mod fixtures;
mod test_cli;
mod test_end_to_end;
mod test_error_handling;
mod test_strategies;
