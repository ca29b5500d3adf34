//! Host and client talking over real sockets on localhost.

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ogonline_core::{ConnectionState, Online, OnlineConfig};
use ogonline_netd::{Headless, TcpTransport};
use ogonline_proto::ConnectionClosedReason;

fn free_address() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

fn node(name: &str, build_id: i32) -> Headless {
    let config = OnlineConfig {
        player_name: name.to_owned(),
        build_id,
        threaded_network: false,
        ..OnlineConfig::default()
    };
    let transport = Arc::new(TcpTransport::new().unwrap());
    Headless::new(Online::new(config, transport), Duration::from_millis(5))
}

fn step_until(host: &mut Headless, client: &mut Headless, done: impl Fn(&Headless, &Headless) -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        host.step();
        client.step();
        if done(host, client) {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn client_joins_over_tcp_and_chats() {
    let address = free_address();
    let mut host = node("Turner", 300);
    host.host(&address, "Data/Levels/arena.xml", "", 2).unwrap();
    let mut client = node("Amber", 300);
    client.join(&address).unwrap();

    assert!(step_until(&mut host, &mut client, |h, c| {
        h.online().peer_state(1) == Some(ConnectionState::Active) && c.online().player_count() == 2
    }));
    assert_eq!(client.online().local_player_id(), 1);
    assert_eq!(client.scene().level(), Some(("Data/Levels/arena.xml", "")));

    client.online_mut().broadcast_chat_message("over the wire");
    assert!(step_until(&mut host, &mut client, |_, c| {
        c.online()
            .chat_lines()
            .iter()
            .any(|l| l == "Amber: over the wire")
    }));
}

#[test]
fn close_reason_crosses_the_socket() {
    let address = free_address();
    let mut host = node("Turner", 300);
    host.host(&address, "Data/Levels/arena.xml", "", 1).unwrap();
    let mut client = node("Amber", 200);
    client.join(&address).unwrap();

    assert!(step_until(&mut host, &mut client, |_, c| !c.online().is_active()));
    assert_eq!(
        client.online().last_close_reason(),
        Some(ConnectionClosedReason::ClientOutdated)
    );
    assert_eq!(host.online().peer_count(), 0);
}
