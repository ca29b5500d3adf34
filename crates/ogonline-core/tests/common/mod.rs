#![allow(dead_code)]

use std::sync::Arc;
use std::time::Instant;

use ogonline_core::handlers::BuildVersionRequestHandler;
use ogonline_core::{register_handlers, MemoryNetwork, MemoryScene, ModInfo, Online, OnlineConfig};
use ogonline_proto::math::Vec3;
use ogonline_proto::messages::BuildVersionRequest;
use ogonline_proto::ObjectId;

pub const ADDRESS: &str = "memory:host";
pub const LEVEL: &str = "Data/Levels/arena.xml";

pub struct Node {
    pub online: Online,
    pub scene: MemoryScene,
}

impl Node {
    pub fn new(net: &MemoryNetwork, config: OnlineConfig, scene: MemoryScene) -> Self {
        Self {
            online: Online::new(config, Arc::new(net.endpoint())),
            scene,
        }
    }

    pub fn tick(&mut self) {
        self.online.pump_network();
        self.online.update(&mut self.scene, Instant::now());
    }

    pub fn chat_contains(&self, needle: &str) -> bool {
        self.online.chat_lines().iter().any(|l| l.contains(needle))
    }
}

pub fn config(name: &str) -> OnlineConfig {
    OnlineConfig {
        player_name: name.to_owned(),
        threaded_network: false,
        build_id: 300,
        ..OnlineConfig::default()
    }
}

pub fn config_with_mods(name: &str, mods: &[&str]) -> OnlineConfig {
    OnlineConfig {
        mods: mods.iter().map(|m| ModInfo::new(*m)).collect(),
        ..config(name)
    }
}

/// Host scene: the host's own avatar plus `free_avatars` idle ones.
pub fn host_scene(free_avatars: usize) -> (MemoryScene, Vec<ObjectId>) {
    let mut scene = MemoryScene::new();
    let avatars = (0..=free_avatars)
        .map(|i| scene.spawn_avatar(Vec3::new(i as f32, 0.0, 0.0)))
        .collect();
    (scene, avatars)
}

/// Starts hosting with the level already loaded and running.
pub fn start_host(net: &MemoryNetwork, config: OnlineConfig, scene: MemoryScene) -> Node {
    let mut host = Node::new(net, config, scene);
    host.online.start_hosting(ADDRESS, LEVEL, "").unwrap();
    host.online.set_level_loaded(&mut host.scene);
    host.online.session_started(true);
    host
}

pub fn join(net: &MemoryNetwork, config: OnlineConfig, scene: MemoryScene) -> Node {
    let mut client = Node::new(net, config, scene);
    client.online.connect(ADDRESS).unwrap();
    client
}

/// A client that answers the version request and nothing else, so the host
/// keeps it waiting for client parameters.
pub fn join_stalled(net: &MemoryNetwork, config: OnlineConfig, scene: MemoryScene) -> Node {
    let registry = register_handlers! {
        BuildVersionRequest => BuildVersionRequestHandler,
    };
    let mut client = Node {
        online: Online::with_registry(config, Arc::new(net.endpoint()), registry),
        scene,
    };
    client.online.connect(ADDRESS).unwrap();
    client
}

pub fn pump(host: &mut Node, clients: &mut [&mut Node], rounds: usize) {
    for _ in 0..rounds {
        host.tick();
        for client in clients.iter_mut() {
            client.tick();
        }
    }
}
