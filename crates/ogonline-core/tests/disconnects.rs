mod common;

use common::*;
use ogonline_core::{ConnectionState, MemoryNetwork, MemoryScene, MultiplayerMode};
use ogonline_proto::messages::{EntityKind, RemoveObject};
use ogonline_proto::ConnectionClosedReason;

const ROUNDS: usize = 40;

#[test]
fn older_client_is_told_it_is_outdated() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut old = config("Amber");
    old.build_id = 299;
    let mut client = join(&net, old, client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);

    assert!(!client.online.is_active());
    assert_eq!(client.online.mode(), MultiplayerMode::None);
    assert_eq!(
        client.online.last_close_reason(),
        Some(ConnectionClosedReason::ClientOutdated)
    );
    assert!(client.online.last_error().is_some());
    assert_eq!(host.online.peer_count(), 0);
    assert_eq!(host.online.player_count(), 1);
}

#[test]
fn newer_client_reports_server_outdated() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut newer = config("Amber");
    newer.build_id = 301;
    let mut client = join(&net, newer, client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);

    assert_eq!(
        client.online.last_close_reason(),
        Some(ConnectionClosedReason::ServerOutdated)
    );
}

#[test]
fn mod_mismatch_is_explained_on_host_then_closed() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config_with_mods("Turner", &["ragdoll-plus"]), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config_with_mods("Amber", &["ragdoll-plus", "hats"]), client_scene);

    pump(&mut host, &mut [&mut client], ROUNDS);

    assert_eq!(
        client.online.last_close_reason(),
        Some(ConnectionClosedReason::ModMismatch)
    );
    assert!(host.chat_contains("\"Amber\" tried to connect, but was rejected entry due to a mod mismatch"));
    assert!(host.chat_contains(" - Expected mods: \"ragdoll-plus\""));
    assert!(host.chat_contains(" - Client's mods: \"ragdoll-plus, hats\""));
}

#[test]
fn full_lobby_turns_away_extra_clients() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(2);
    let mut host_config = config("Turner");
    host_config.player_limit = 2;
    let mut host = start_host(&net, host_config, scene);

    let (first_scene, _) = host_scene(2);
    let mut first = join(&net, config("Amber"), first_scene);
    pump(&mut host, &mut [&mut first], ROUNDS);

    let (second_scene, _) = host_scene(2);
    let mut second = join(&net, config("Birch"), second_scene);
    pump(&mut host, &mut [&mut first, &mut second], ROUNDS);

    assert!(first.online.is_active());
    assert!(!second.online.is_active());
    assert_eq!(
        second.online.last_close_reason(),
        Some(ConnectionClosedReason::LobbyFull)
    );
    assert_eq!(host.online.peer_count(), 1);
    assert!(host.chat_contains("the lobby is full"));
}

#[test]
fn host_only_message_from_client_is_a_bad_request() {
    let net = MemoryNetwork::new();
    let (scene, avatars) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);
    pump(&mut host, &mut [&mut client], ROUNDS);

    client.online.send(RemoveObject {
        object_id: avatars[0],
        kind: EntityKind::MovementObject,
    });
    pump(&mut host, &mut [&mut client], ROUNDS);

    assert!(host.scene.object(avatars[0]).is_some());
    assert_eq!(
        client.online.last_close_reason(),
        Some(ConnectionClosedReason::BadRequest)
    );
    assert!(host.online.player_state(1).is_none());
    assert!(host.chat_contains("Amber disconnected"));
}

#[test]
fn leaving_player_frees_level_avatar() {
    let net = MemoryNetwork::new();
    let (scene, avatars) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);
    pump(&mut host, &mut [&mut client], ROUNDS);
    assert!(host.scene.object(avatars[1]).unwrap().controller.is_some());

    client.online.stop_multiplayer();
    pump(&mut host, &mut [&mut client], ROUNDS);

    assert_eq!(host.online.peer_count(), 0);
    assert!(host.online.player_state(1).is_none());
    assert_eq!(host.scene.object(avatars[1]).unwrap().controller, None);
    assert!(host.chat_contains("Amber disconnected"));

    // The freed avatar goes to the next player.
    let (again_scene, _) = host_scene(1);
    let mut again = join(&net, config("Birch"), again_scene);
    pump(&mut host, &mut [&mut again], ROUNDS);
    assert_eq!(host.online.player_state(2).unwrap().object_id, avatars[1]);
}

#[test]
fn leaving_player_takes_spawned_character_along() {
    let net = MemoryNetwork::new();
    let (scene, avatars) = host_scene(0);
    let mut host = start_host(&net, config("Turner"), scene);
    let mut early_scene = MemoryScene::new();
    early_scene.spawn_with_id(avatars[0], EntityKind::MovementObject);
    let mut early = join(&net, config("Amber"), early_scene);
    pump(&mut host, &mut [&mut early], ROUNDS);

    let mut leaver_scene = MemoryScene::new();
    leaver_scene.spawn_with_id(avatars[0], EntityKind::MovementObject);
    let mut leaver = join(&net, config("Birch"), leaver_scene);
    pump(&mut host, &mut [&mut early, &mut leaver], ROUNDS);

    let spawned = host.online.player_state(2).unwrap().object_id;
    assert!(host.scene.object(spawned).unwrap().created_on_the_fly);
    let early_copy = early.online.object_id(spawned);
    assert!(early.scene.object(early_copy).is_some());

    net.sever(leaver_conn(&host));
    pump(&mut host, &mut [&mut early, &mut leaver], ROUNDS);

    assert!(host.scene.object(spawned).is_none());
    assert!(early.scene.object(early_copy).is_none());
    assert!(early.online.player_state(2).is_none());
    assert_eq!(
        leaver.online.last_close_reason(),
        Some(ConnectionClosedReason::Disconnected)
    );
}

#[test]
fn stopping_the_host_ends_every_client() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join(&net, config("Amber"), client_scene);
    pump(&mut host, &mut [&mut client], ROUNDS);

    host.online.stop_multiplayer();
    for _ in 0..4 {
        client.tick();
    }

    assert!(!host.online.is_active());
    assert_eq!(
        client.online.last_close_reason(),
        Some(ConnectionClosedReason::HostStoppedHosting)
    );
    assert!(client.online.last_error().is_some());

    // The address is free again.
    let (scene, _) = host_scene(1);
    let mut rehost = Node::new(&net, config("Turner"), scene);
    assert!(rehost.online.start_hosting(ADDRESS, LEVEL, "").is_ok());
}

#[test]
fn dropping_out_mid_handshake_leaves_no_player_behind() {
    let net = MemoryNetwork::new();
    let (scene, _) = host_scene(1);
    let mut host = start_host(&net, config("Turner"), scene);
    let (client_scene, _) = host_scene(1);
    let mut client = join_stalled(&net, config("Amber"), client_scene);
    pump(&mut host, &mut [&mut client], ROUNDS);
    assert_eq!(
        host.online.peer_state(1),
        Some(ConnectionState::AwaitingClientParameters)
    );

    net.sever(host.online.peer_conn(1).unwrap());
    pump(&mut host, &mut [&mut client], ROUNDS);

    assert_eq!(host.online.peer_count(), 0);
    assert_eq!(host.online.peer_state(1), None);
    assert!(host.online.player_state(1).is_none());
    assert_eq!(host.online.player_count(), 1);
    assert!(!host.chat_contains("disconnected!"));
}

/// Host side connection of the player with peer id 2.
fn leaver_conn(host: &Node) -> u64 {
    host.online.peer_conn(2).unwrap()
}
