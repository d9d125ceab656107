//! UseCase: プライベートメッセージ送信処理
//!
//! 宛先がオフライン（接続なし・チャンネルが閉じている）の場合は、
//! メッセージを載せた通知を宛先のオフラインキューに積む。
//! これはエラーではなく配信経路の分岐であり、送信者にはエラーを返さない。

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ConnectionRegistry, EventPayload, HistoryStore, Message, MessageBody, MessageIdGenerator,
    MessageKind, Notification, PrincipalId, ServerEvent, Timestamp,
};

use super::CommandError;

/// プライベートメッセージの配信結果
#[derive(Debug, Clone, PartialEq)]
pub enum PrivateDelivery {
    /// 宛先の接続に届けた
    Delivered(Message),
    /// 宛先がオフラインのため通知として積んだ
    Queued(Message),
}

impl PrivateDelivery {
    pub fn message(&self) -> &Message {
        match self {
            Self::Delivered(message) | Self::Queued(message) => message,
        }
    }
}

/// プライベートメッセージ送信のユースケース
pub struct SendPrivateMessageUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    history: Arc<dyn HistoryStore>,
    ids: Arc<MessageIdGenerator>,
    clock: Arc<dyn Clock>,
}

impl SendPrivateMessageUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        history: Arc<dyn HistoryStore>,
        ids: Arc<MessageIdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            history,
            ids,
            clock,
        }
    }

    /// プライベートメッセージ送信を実行
    ///
    /// 自分宛てでなければ、送信者にも同じ `privateMessage` を返す。
    pub async fn execute(
        &self,
        sender_id: &PrincipalId,
        target_id: &PrincipalId,
        body: String,
        kind: MessageKind,
    ) -> Result<PrivateDelivery, CommandError> {
        let body = MessageBody::new(body).map_err(|_| CommandError::EmptyMessage)?;

        let now = Timestamp::new(self.clock.now_millis());
        let message = Message::to_principal(
            self.ids.next_id(),
            target_id.clone(),
            sender_id.clone(),
            body,
            kind,
            now,
        );
        let event = ServerEvent::new(
            now,
            EventPayload::PrivateMessage {
                message: message.clone(),
            },
        );

        let delivery = match self.registry.push_to(target_id, &event).await {
            Ok(()) => PrivateDelivery::Delivered(message),
            Err(e) => {
                tracing::debug!(
                    target_id = %target_id,
                    reason = %e,
                    "Recipient offline, queueing notification"
                );
                self.history
                    .queue_offline(target_id, &Notification::private_message(message.clone(), now))
                    .await;
                PrivateDelivery::Queued(message)
            }
        };

        if sender_id != target_id
            && let Err(e) = self.registry.push_to(sender_id, &event).await
        {
            tracing::debug!(sender_id = %sender_id, error = %e, "Sender echo not delivered");
        }

        Ok(delivery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecase::test_support::{Fixture, drain, principal_id};

    fn usecase(fixture: &Fixture) -> SendPrivateMessageUseCase {
        SendPrivateMessageUseCase::new(
            fixture.registry.clone(),
            fixture.history.clone(),
            fixture.ids.clone(),
            fixture.clock.clone(),
        )
    }

    #[tokio::test]
    async fn test_online_recipient_and_sender_receive_message() {
        // テスト項目: オンラインの宛先と送信者の両方に privateMessage が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let mut alice_rx = fixture.connect("alice").await;
        let mut bob_rx = fixture.connect("bob").await;

        // when (操作):
        let delivery = usecase(&fixture)
            .execute(
                &principal_id("alice"),
                &principal_id("bob"),
                "psst".to_string(),
                MessageKind::Text,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(delivery, PrivateDelivery::Delivered(_)));
        let expected = vec![EventPayload::PrivateMessage {
            message: delivery.message().clone(),
        }];
        assert_eq!(drain(&mut bob_rx), expected);
        assert_eq!(drain(&mut alice_rx), expected);
    }

    #[tokio::test]
    async fn test_offline_recipient_gets_notification_queued() {
        // テスト項目: オフラインの宛先にはオフラインキューに通知が積まれる
        // given (前提条件):
        let fixture = Fixture::new();
        let mut carol_rx = fixture.connect("carol").await;

        // when (操作):
        let delivery = usecase(&fixture)
            .execute(
                &principal_id("carol"),
                &principal_id("dave"),
                "see you".to_string(),
                MessageKind::Text,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(delivery, PrivateDelivery::Queued(_)));
        assert_eq!(drain(&mut carol_rx).len(), 1);
        let queued = fixture.history.drain_offline(&principal_id("dave")).await;
        assert_eq!(queued.len(), 1);
        assert_eq!(&queued[0].message, delivery.message());
    }

    #[tokio::test]
    async fn test_message_to_self_is_delivered_once() {
        // テスト項目: 自分宛てのメッセージは 1 回だけ届く
        // given (前提条件):
        let fixture = Fixture::new();
        let mut alice_rx = fixture.connect("alice").await;

        // when (操作):
        usecase(&fixture)
            .execute(
                &principal_id("alice"),
                &principal_id("alice"),
                "note to self".to_string(),
                MessageKind::Text,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(drain(&mut alice_rx).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_private_message_is_rejected() {
        // テスト項目: 空の本文は EmptyMessage で、通知も積まれない
        // given (前提条件):
        let fixture = Fixture::new();

        // when (操作):
        let result = usecase(&fixture)
            .execute(
                &principal_id("alice"),
                &principal_id("bob"),
                "  ".to_string(),
                MessageKind::Text,
            )
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(CommandError::EmptyMessage));
        assert!(fixture.history.drain_offline(&principal_id("bob")).await.is_empty());
    }
}
