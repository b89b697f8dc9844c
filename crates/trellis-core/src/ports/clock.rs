//! Clock port - 現在時刻の抽象化
//!
//! テストで時刻を固定できるよう trait にしています。
//!
//! # 実装
//! - **SystemClock**: 実時刻（本番用）
//! - **FixedClock**: 固定時刻（テスト用）

use chrono::{DateTime, Utc};

/// Clock は現在時刻を返す
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 常に同じ時刻を返す
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.at
    }
}
