use ogonline_proto::codec::{decode_package, encode_package};
use ogonline_proto::constants::HEADER_LEN;
use ogonline_proto::messages::{ChatEntry, LevelMessage};
use ogonline_proto::OnlineMessage;
use proptest::prelude::*;

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = decode_package(&bytes);
    }

    #[test]
    fn corrupted_payload_is_rejected_or_decoded(
        text in ".{0,200}",
        flip in any::<usize>(),
        bit in 0u8..8,
    ) {
        let msg: OnlineMessage = ChatEntry { text }.into();
        let mut bytes = encode_package(&msg).unwrap();
        if bytes.len() > HEADER_LEN {
            let idx = HEADER_LEN + flip % (bytes.len() - HEADER_LEN);
            bytes[idx] ^= 1 << bit;
        }
        // Either a clean error or some chat entry, never a different message type.
        if let Ok(decoded) = decode_package(&bytes) {
            prop_assert!(matches!(decoded.message, OnlineMessage::ChatEntry(_)));
        }
    }

    #[test]
    fn level_messages_keep_their_text(msg in ".{0,512}") {
        let encoded = encode_package(&LevelMessage { msg: msg.clone() }.into()).unwrap();
        let decoded = decode_package(&encoded).unwrap();
        prop_assert_eq!(decoded.message, OnlineMessage::LevelMessage(LevelMessage { msg }));
    }
}
