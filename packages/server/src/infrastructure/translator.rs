//! 組み込みカタログによる Translator 実装
//!
//! 言語サブタグ（`ja-JP` → `ja`）でカタログを選び、
//! 見つからなければ英語、英語にもなければキーそのものを返す。

use std::collections::HashMap;

use crate::domain::{Locale, Translator};

const EN: &[(&str, &str)] = &[
    ("error.auth_required", "Authentication is required."),
    ("error.not_in_room", "You are not a member of room {roomId}."),
    ("error.room_access_denied", "Access to room {roomId} was denied: {reason}"),
    ("error.empty_message", "Message body must not be empty."),
    ("error.invalid_command", "Invalid command: {detail}"),
    ("notification.private_message", "New private message from {senderId}"),
];

const JA: &[(&str, &str)] = &[
    ("error.auth_required", "認証が必要です。"),
    ("error.not_in_room", "ルーム {roomId} に参加していません。"),
    ("error.room_access_denied", "ルーム {roomId} への参加が拒否されました: {reason}"),
    ("error.empty_message", "メッセージ本文が空です。"),
    ("error.invalid_command", "不正なコマンドです: {detail}"),
    ("notification.private_message", "{senderId} さんから新しいプライベートメッセージ"),
];

pub struct StaticTranslator {
    catalogs: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl StaticTranslator {
    pub const FALLBACK_LANGUAGE: &'static str = "en";

    pub fn new() -> Self {
        let catalogs = [("en", EN), ("ja", JA)]
            .into_iter()
            .map(|(language, entries)| (language, entries.iter().copied().collect()))
            .collect();
        Self { catalogs }
    }

    fn lookup(&self, language: &str, key: &str) -> Option<&'static str> {
        self.catalogs.get(language)?.get(key).copied()
    }
}

impl Default for StaticTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for StaticTranslator {
    fn translate(&self, locale: &Locale, key: &str, args: &[(&str, &str)]) -> String {
        let template = self
            .lookup(&locale.language(), key)
            .or_else(|| self.lookup(Self::FALLBACK_LANGUAGE, key))
            .unwrap_or(key);

        args.iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_with_placeholders() {
        // テスト項目: プレースホルダが置き換えられる
        // given (前提条件):
        let translator = StaticTranslator::new();

        // when (操作):
        let text = translator.translate(
            &Locale::default(),
            "error.not_in_room",
            &[("roomId", "general")],
        );

        // then (期待する結果):
        assert_eq!(text, "You are not a member of room general.");
    }

    #[test]
    fn test_translate_uses_language_subtag() {
        // テスト項目: `ja-JP` は日本語カタログを使う
        // given (前提条件):
        let translator = StaticTranslator::new();
        let locale = Locale::new(Some("ja-JP".to_string()));

        // when (操作):
        let text = translator.translate(
            &locale,
            "notification.private_message",
            &[("senderId", "carol")],
        );

        // then (期待する結果):
        assert_eq!(text, "carol さんから新しいプライベートメッセージ");
    }

    #[test]
    fn test_translate_falls_back_to_english_then_key() {
        // テスト項目: 未知の言語は英語、未知のキーはキーそのもの
        // given (前提条件):
        let translator = StaticTranslator::new();
        let locale = Locale::new(Some("fr".to_string()));

        // when (操作):
        let english = translator.translate(&locale, "error.empty_message", &[]);
        let unknown = translator.translate(&locale, "error.unknown", &[]);

        // then (期待する結果):
        assert_eq!(english, "Message body must not be empty.");
        assert_eq!(unknown, "error.unknown");
    }
}
