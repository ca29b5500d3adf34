//! Small helpers shared by the host and client paths.

use crate::config::ModInfo;

/// Name shown for players whose requested name was rejected.
pub const INVALID_PLAYER_NAME: &str = "InvalidName";

/// A player name is valid when it is longer than two characters and only
/// contains ASCII letters, digits and spaces.
pub fn is_valid_player_name(name: &str) -> bool {
    name.len() > 2
        && name
            .bytes()
            .all(|c| c.is_ascii_alphanumeric() || c == b' ')
}

fn is_checked(m: &ModInfo) -> bool {
    m.active && !m.core
}

/// Comma separated list of active non-core mods. Mods without online support
/// are wrapped in brackets. Host and client must produce identical strings.
pub fn active_mods_string(mods: &[ModInfo]) -> String {
    mods.iter()
        .filter(|m| is_checked(m))
        .map(|m| {
            if m.supports_online {
                m.id.clone()
            } else {
                format!("[{}]", m.id)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn has_active_incompatible_mods(mods: &[ModInfo]) -> bool {
    mods.iter().any(|m| is_checked(m) && !m.supports_online)
}

pub fn active_incompatible_mods_string(mods: &[ModInfo]) -> String {
    mods.iter()
        .filter(|m| is_checked(m) && !m.supports_online)
        .map(|m| format!("\"{}\"", m.id))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_names() {
        assert!(is_valid_player_name("Turner"));
        assert!(is_valid_player_name("Rabbit 42"));
        assert!(!is_valid_player_name("ab"));
        assert!(!is_valid_player_name(""));
        assert!(!is_valid_player_name("bad_name"));
        assert!(!is_valid_player_name("héllo"));
    }

    #[test]
    fn mods_string_skips_core_and_inactive() {
        let mut core = ModInfo::new("core");
        core.core = true;
        let mut off = ModInfo::new("off");
        off.active = false;
        let mut offline = ModInfo::new("offline");
        offline.supports_online = false;
        let mods = vec![ModInfo::new("alpha"), core, off, offline, ModInfo::new("beta")];

        assert_eq!(active_mods_string(&mods), "alpha, [offline], beta");
        assert!(has_active_incompatible_mods(&mods));
        assert_eq!(active_incompatible_mods_string(&mods), "\"offline\"");
    }
}
