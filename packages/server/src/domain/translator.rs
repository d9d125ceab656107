//! 表示テキストの翻訳インターフェース

use super::value_object::Locale;

/// ロケールと翻訳キーから表示テキストを生成する
///
/// `args` は `{name}` 形式のプレースホルダを置き換える。
pub trait Translator: Send + Sync {
    fn translate(&self, locale: &Locale, key: &str, args: &[(&str, &str)]) -> String;
}
