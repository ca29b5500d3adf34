mod common;

use common::*;
use ogonline_core::{ConnectionState, MemoryNetwork, MemoryScene, MultiplayerMode};
use ogonline_proto::ids::HOST_PLAYER_ID;
use ogonline_proto::messages::{ChatEntry, EntityKind, PlayerState, SetPlayerState};

const ROUNDS: usize = 40;

#[test]
fn client_joins_and_takes_a_free_avatar() {
    let net = MemoryNetwork::new();
    let (scene, avatars) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);

    assert_eq!(host.online.mode(), MultiplayerMode::Host);
    assert_eq!(client.online.mode(), MultiplayerMode::Client);
    assert_eq!(host.online.peer_state(1), Some(ConnectionState::Active));
    assert_eq!(client.online.local_player_id(), 1);
    assert!(client.online.host_started_level());
    assert_eq!(client.scene.level(), Some((LEVEL, "")));

    let host_state = host.online.player_state(HOST_PLAYER_ID).unwrap();
    assert_eq!(host_state.object_id, avatars[0]);
    let joined = host.online.player_state(1).unwrap();
    assert_eq!(joined.player_name, "Amber");
    assert_eq!(joined.object_id, avatars[1]);
    assert_eq!(
        host.scene.object(avatars[1]).unwrap().controller,
        Some(joined.controller_id)
    );

    // The joiner sees the host and itself with the same avatars.
    let seen = client.online.player_states();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[&1].object_id, avatars[1]);
    assert_eq!(seen[&HOST_PLAYER_ID].player_name, "Turner");

    assert!(host.chat_contains("Amber just joined!"));
    assert!(client.chat_contains("Amber just joined!"));
}

#[test]
fn joiner_without_free_avatar_gets_a_new_character() {
    let net = MemoryNetwork::new();
    let (scene, avatars) = host_scene(0);
    let mut host = start_host(&net, config("Turner"), scene);
    let mut client_scene = MemoryScene::with_id_base(500);
    client_scene.spawn_with_id(avatars[0], EntityKind::MovementObject);
    let mut client = join(&net, config("Amber"), client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);

    let created = host.online.player_state(1).unwrap().object_id;
    assert_ne!(created, avatars[0]);
    assert!(host.scene.object(created).unwrap().created_on_the_fly);

    // The client spawned its own copy and maps the host id onto it.
    let local = client.online.object_id(created);
    assert!(local >= 500);
    assert_eq!(client.online.original_id(local), created);
    assert_eq!(client.scene.object(local).unwrap().kind, EntityKind::MovementObject);
    assert_eq!(client.online.player_state(1).unwrap().object_id, local);
}

#[test]
fn development_build_is_admitted_with_a_warning() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut dev = config("Amber");
    dev.build_id = -1;
    let mut client = join(&net, dev, client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);

    assert_eq!(host.online.peer_state(1), Some(ConnectionState::Active));
    assert!(client.chat_contains("[Warning]"));
}

#[test]
fn invalid_name_is_replaced_on_join() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("x!"), client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);

    assert_eq!(host.online.player_state(1).unwrap().player_name, "InvalidName");
}

#[test]
fn client_waits_until_host_starts_the_level() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = Node::new(&net, config("Turner"), scene);
    host.online.start_hosting(ADDRESS, LEVEL, "").unwrap();
    host.online.set_level_loaded(&mut host.scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);
    assert_eq!(host.online.peer_state(1), Some(ConnectionState::AwaitingLoadCompletion));
    assert!(host.online.is_every_client_loaded());
    assert!(client.online.player_state(1).is_none());

    host.online.session_started(true);
    pump(&mut host, &mut [&mut client], ROUNDS);
    assert_eq!(host.online.peer_state(1), Some(ConnectionState::Active));
    assert!(client.online.player_state(1).is_some());
}

#[test]
fn chat_is_relayed_with_sender_name_and_commands_stay_on_host() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);
    pump(&mut host, &mut [&mut client], ROUNDS);

    client.online.broadcast_chat_message("hello there");
    host.online.broadcast_chat_message("welcome");
    client.online.broadcast_chat_message("/kick  bob");
    pump(&mut host, &mut [&mut client], ROUNDS);

    assert!(host.chat_contains("Amber: hello there"));
    assert!(client.chat_contains("Amber: hello there"));
    assert!(client.chat_contains("Turner: welcome"));
    assert!(!client.chat_contains("/kick"));
    assert_eq!(
        host.online.take_commands(),
        vec![(1, vec!["kick".to_owned(), "bob".to_owned()])]
    );
    assert!(host.online.take_commands().is_empty());
}

#[test]
fn host_session_flags_reach_clients() {
    use ogonline_proto::messages::OnlineFlag;

    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    host.online.set_host_session_flag(OnlineFlag::HighFiveEnabled, true);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);
    pump(&mut host, &mut [&mut client], ROUNDS);
    assert!(client.online.host_session_flag(OnlineFlag::HighFiveEnabled));
    assert!(!client.online.host_session_flag(OnlineFlag::AllowsEditor));

    host.online.set_host_session_flag(OnlineFlag::AllowsEditor, true);
    pump(&mut host, &mut [&mut client], ROUNDS);
    assert!(client.online.host_session_flag(OnlineFlag::AllowsEditor));
}

#[test]
fn chat_from_a_peer_still_joining_is_dropped() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut stalled = join_stalled(&net, config("Amber"), client_scene);
    let (other_scene, _) = host_scene(1);
    let mut other = join(&net, config("Birch"), other_scene);
    pump(&mut host, &mut [&mut stalled, &mut other], ROUNDS);
    assert_eq!(
        host.online.peer_state(1),
        Some(ConnectionState::AwaitingClientParameters)
    );
    assert!(host.online.is_peer_active(2));

    stalled.online.send(ChatEntry {
        text: "spam before joining".to_owned(),
    });
    pump(&mut host, &mut [&mut stalled, &mut other], ROUNDS);

    assert!(!host.chat_contains("spam"));
    assert!(!other.chat_contains("spam"));
    assert_eq!(
        host.online.peer_state(1),
        Some(ConnectionState::AwaitingClientParameters)
    );
}

#[test]
fn player_state_without_an_id_is_ignored() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);
    pump(&mut host, &mut [&mut client], ROUNDS);

    host.online.send(SetPlayerState {
        state: PlayerState {
            player_name: "Nobody".to_owned(),
            ..PlayerState::default()
        },
    });
    pump(&mut host, &mut [&mut client], ROUNDS);

    let seen = client.online.player_states();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[&HOST_PLAYER_ID].player_name, "Turner");
    assert!(seen.values().all(|s| s.player_name != "Nobody"));
}
