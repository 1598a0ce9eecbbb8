//! Classification of user-owned files.
//!
//! A user-config path holds state the player created or tuned: client
//! preferences, world files, per-plugin state, logs. The applier never
//! overwrites such a file once it exists, whatever the plan says. This check
//! is independent of [`ExclusionSet`](super::ExclusionSet) and takes
//! precedence over it.

use super::normalize;

/// Client preference and database files at the installation root.
const USER_CONFIG_FILES: &[&str] = &["mushclient.ini", "mushclient_prefs.sqlite", "mushclient.db"];

/// Directories whose whole contents belong to the user.
const USER_CONFIG_DIRS: &[&str] = &["worlds/plugins/state/", "logs/", "settings/"];

/// World files are matched by location and suffix.
const WORLDS_DIR: &str = "worlds/";
const WORLD_FILE_SUFFIX: &str = ".mcl";

/// Returns `true` if `path` names a user-owned file. Case-insensitive.
///
/// # Examples
///
/// ```rust
/// use mudsync::policy::is_user_config;
///
/// assert!(is_user_config("MUSHclient.ini"));
/// assert!(is_user_config("worlds/Aardwolf.mcl"));
/// assert!(is_user_config("logs/2024-01-01.txt"));
/// assert!(!is_user_config("scripts/main.lua"));
/// ```
#[must_use]
pub fn is_user_config(path: &str) -> bool {
    let path = normalize(path).to_lowercase();

    if USER_CONFIG_FILES.contains(&path.as_str()) {
        return true;
    }

    if path.starts_with(WORLDS_DIR) && path.ends_with(WORLD_FILE_SUFFIX) {
        return true;
    }

    USER_CONFIG_DIRS.iter().any(|dir| path.starts_with(dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_files() {
        assert!(is_user_config("mushclient.ini"));
        assert!(is_user_config("MUSHCLIENT_PREFS.SQLITE"));
        assert!(is_user_config("./mushclient.db"));
        // Only at the root.
        assert!(!is_user_config("defaults/mushclient.ini"));
    }

    #[test]
    fn test_world_files() {
        assert!(is_user_config("worlds/Main.MCL"));
        assert!(is_user_config("worlds\\sub\\alt.mcl"));
        assert!(!is_user_config("worlds/readme.txt"));
        assert!(!is_user_config("templates/main.mcl"));
    }

    #[test]
    fn test_protected_directories() {
        assert!(is_user_config("worlds/plugins/state/abc-123.xml"));
        assert!(is_user_config("Logs/session.txt"));
        assert!(is_user_config("settings/keys.json"));
        assert!(!is_user_config("worlds/plugins/chat.xml"));
        assert!(!is_user_config("logsheet.txt"));
    }
}
