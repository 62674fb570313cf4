//! Slug - タイトルから URL 用の識別子を導出
//!
//! slug は post document の主キーも兼ねるため、変換規則は固定です。
//!
//! # 変換規則
//! 1. 前後の空白を除去して小文字化
//! 2. `a-z`, `0-9`, 空白, `-` 以外の文字を削除
//! 3. 空白と `-` の連続を 1 つの `-` に置換
//!
//! `-` も区切りとして扱うので `slugify(slugify(x)) == slugify(x)` が成り立ちます。

/// タイトル（または入力中の slug）を slug に変換する純粋関数
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();

    let mut slug = String::with_capacity(lowered.len());
    let mut in_separator = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() || ch == '-' {
            if !in_separator {
                slug.push('-');
                in_separator = true;
            }
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
            in_separator = false;
        }
        // 削除された文字は区切りの連続を途切れさせない
    }
    slug
}
