use ogonline_core::OnlineMessageRef;
use ogonline_core::queues::{MessageQueue, PersistentLog};
use ogonline_proto::messages::{LevelMessage, SetObjectEnabled};
use proptest::prelude::*;

proptest! {
    #[test]
    fn ref_count_follows_clones(holders in 1usize..32, dropped in 0usize..32) {
        let original = OnlineMessageRef::new(LevelMessage { msg: "tick".to_owned() });
        let weak = original.downgrade();
        let mut clones = (0..holders).map(|_| original.clone()).collect::<Vec<_>>();
        prop_assert_eq!(original.ref_count(), holders + 1);

        let dropped = dropped.min(holders);
        clones.truncate(holders - dropped);
        prop_assert_eq!(original.ref_count(), holders - dropped + 1);
        prop_assert!(clones.iter().all(|c| OnlineMessageRef::ptr_eq(c, &original)));

        drop(clones);
        drop(original);
        prop_assert!(weak.is_released());
        prop_assert!(weak.upgrade().is_none());
    }
}

#[test]
fn queued_and_logged_message_is_shared_not_copied() {
    let queue = MessageQueue::new();
    let log = PersistentLog::new();
    let message = OnlineMessageRef::new(SetObjectEnabled {
        object_id: 3,
        enabled: true,
    });
    queue.push(message.clone());
    log.append(message.clone());
    assert_eq!(message.ref_count(), 3);

    let drained = queue.drain();
    assert!(OnlineMessageRef::ptr_eq(&drained[0], &message));
    drop(drained);
    assert_eq!(message.ref_count(), 2);

    log.clear();
    assert_eq!(message.ref_count(), 1);
    assert_eq!(message.get::<SetObjectEnabled>().map(|m| m.object_id), Some(3));
}
