//! IdGenerator port - ID 生成の抽象化
//!
//! プラットフォームの「unique ID」に相当する ID をクライアント側で生成します。
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）
//! - **SequenceGenerator**: 連番（テスト用）

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::ids::{AssetId, UserId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は新しい asset / account の ID を生成
///
/// # ULID の特性
/// - 26 文字の英数字（プラットフォームの ID 制約 36 文字以内に収まる）
/// - 時刻でソート可能
/// - 調整なしで生成可能
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    /// Asset ID を生成
    fn generate_asset_id(&self) -> AssetId;

    /// User ID を生成
    fn generate_user_id(&self) -> UserId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> String {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random()).to_string().to_lowercase()
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_asset_id(&self) -> AssetId {
        AssetId::new(self.next())
    }

    fn generate_user_id(&self) -> UserId {
        UserId::new(self.next())
    }
}

/// SequenceGenerator は `prefix-1`, `prefix-2`, ... を返す
///
/// テストで ID を予測したいときに使います。
pub struct SequenceGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequenceGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    fn next(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}

impl IdGenerator for SequenceGenerator {
    fn generate_asset_id(&self) -> AssetId {
        AssetId::new(self.next())
    }

    fn generate_user_id(&self) -> UserId {
        UserId::new(self.next())
    }
}
