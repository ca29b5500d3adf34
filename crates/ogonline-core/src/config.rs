use std::time::Duration;

use ogonline_proto::constants::DEVELOPMENT_BUILD_ID;

/// A mod known to the local installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInfo {
    pub id: String,
    pub active: bool,
    /// Core mods ship with the game and never take part in compatibility checks.
    pub core: bool,
    pub supports_online: bool,
}

impl ModInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            active: true,
            core: false,
            supports_online: true,
        }
    }
}

/// Local settings a session is started with.
#[derive(Debug, Clone)]
pub struct OnlineConfig {
    /// Build id sent during version check. `-1` marks a development build.
    pub build_id: i32,
    pub player_name: String,
    pub mods: Vec<ModInfo>,
    /// Maximum number of players including the host.
    pub player_limit: usize,
    /// How long the network thread sleeps between steps.
    pub tick_period: Duration,
    pub ping_interval: Duration,
    /// Character spawned for a joining player when no free avatar exists.
    pub hot_join_character: String,
    /// Run the network worker on its own thread. When false the owner drives
    /// it with [`crate::Online::pump_network`].
    pub threaded_network: bool,
    pub max_chat_lines: usize,
    pub max_chat_age: Duration,
    pub allows_editor: bool,
    /// Input binding names forwarded from clients to the host.
    pub bindings: Vec<String>,
}

impl Default for OnlineConfig {
    fn default() -> Self {
        Self {
            build_id: DEVELOPMENT_BUILD_ID,
            player_name: "Unknown Rabbit".to_owned(),
            mods: Vec::new(),
            player_limit: 8,
            tick_period: Duration::from_millis(30),
            ping_interval: Duration::from_secs(1),
            hot_join_character: "Data/Characters/male_rabbit_1.xml".to_owned(),
            threaded_network: true,
            max_chat_lines: 64,
            max_chat_age: Duration::from_secs(120),
            allows_editor: false,
            bindings: [
                "up", "down", "left", "right", "jump", "crouch", "attack", "grab", "item", "drop",
            ]
            .into_iter()
            .map(str::to_owned)
            .collect(),
        }
    }
}
