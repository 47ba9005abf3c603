#![allow(dead_code)]

use std::time::Duration;

use doclift::{LiftError, LiftResult};
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[ctor::ctor]
fn init_tests() {
    // テストの前に一度だけ実行したい処理
    // tracing_subscriberの初期化
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

pub fn lower(value: Value) -> LiftResult<Value> {
    match value {
        Value::String(s) => Ok(json!(s.to_lowercase())),
        other => Err(LiftError::transform(format!("not a string: {}", other))),
    }
}

pub fn reverse(value: Value) -> LiftResult<Value> {
    match value {
        Value::String(s) => Ok(json!(s.chars().rev().collect::<String>())),
        other => Err(LiftError::transform(format!("not a string: {}", other))),
    }
}

pub async fn slow_increment(value: Value) -> LiftResult<Value> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    value
        .as_i64()
        .map(|n| json!(n + 1))
        .ok_or_else(|| LiftError::transform(format!("not an integer: {}", value)))
}

pub async fn slow_lower(value: Value) -> LiftResult<Value> {
    tokio::time::sleep(Duration::from_millis(10)).await;
    lower(value)
}
