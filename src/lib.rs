/*
 * Responsibility
 * - API gateway の認証ゲート (token 抽出 → 検証 → session 確認 → identity header 付与)
 * - binary (main.rs) と tests から使う公開モジュール
 */
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
