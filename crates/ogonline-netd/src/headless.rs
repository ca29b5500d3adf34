//! A session with no game attached.
//!
//! The world is a [`MemoryScene`] holding the avatars joining players take
//! over, which is enough to admit players and relay everything between them.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use ogonline_core::{MemoryScene, Online, SceneGraph};
use ogonline_proto::math::Vec3;
use tracing::info;

pub struct Headless {
    online: Online,
    scene: MemoryScene,
    tick: Duration,
    started: Instant,
}

impl Headless {
    pub fn new(online: Online, tick: Duration) -> Self {
        Self {
            online,
            scene: MemoryScene::new(),
            tick,
            started: Instant::now(),
        }
    }

    pub fn online(&self) -> &Online {
        &self.online
    }

    pub fn online_mut(&mut self) -> &mut Online {
        &mut self.online
    }

    pub fn scene(&self) -> &MemoryScene {
        &self.scene
    }

    /// Hosts `level` with `free_avatars` characters waiting for players.
    pub fn host(&mut self, bind: &str, level: &str, campaign: &str, free_avatars: usize) -> anyhow::Result<()> {
        for i in 0..=free_avatars {
            self.scene.spawn_avatar(Vec3::new(i as f32 * 2.0, 0.0, 0.0));
        }
        self.online
            .start_hosting(bind, level, campaign)
            .with_context(|| format!("failed to host on {bind}"))?;
        if !self.scene.load_level(level, campaign) {
            anyhow::bail!("cannot load level {level:?}");
        }
        self.online.set_level_loaded(&mut self.scene);
        self.online.session_started(true);
        Ok(())
    }

    pub fn join(&mut self, address: &str) -> anyhow::Result<()> {
        self.online
            .connect(address)
            .with_context(|| format!("failed to connect to {address}"))
    }

    pub fn step(&mut self) {
        self.online.pump_network();
        let now = Instant::now();
        self.online.update(&mut self.scene, now);
        let walltime = now.duration_since(self.started).as_secs_f32();
        self.scene.update_movement(walltime, self.tick.as_secs_f32());
        for (player_id, command) in self.online.take_commands() {
            info!(player_id, ?command, "chat command");
        }
    }

    /// Steps until the session ends or `ticks` steps have run.
    ///
    /// Returns an error when a client was disconnected for an unusual reason.
    pub fn run(&mut self, ticks: Option<u64>) -> anyhow::Result<()> {
        let mut n = 0u64;
        while self.online.is_active() && ticks.is_none_or(|t| n < t) {
            self.step();
            n += 1;
            thread::sleep(self.tick);
        }
        if let Some(error) = self.online.last_error() {
            anyhow::bail!("session ended: {error}");
        }
        if let Some(reason) = self.online.last_close_reason() {
            info!(%reason, "session ended");
        }
        Ok(())
    }
}
