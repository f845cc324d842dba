// Stable anonymous identifiers for users and projects.
//
// Both identifiers are truncated SHA-256 digests: no raw usernames or
// paths ever land in the database. The user id is cached on disk so it
// stays stable across sessions on the same machine.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::warn;

const ID_LEN: usize = 16;

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..ID_LEN].to_string()
}

/// Load the cached user id, deriving and caching one on first use.
///
/// The id is a 16-hex-char digest of username + home directory, stored in
/// `user_id.txt` next to the database so it survives restarts. A cache
/// that cannot be written only costs stability across sessions, never a
/// failure.
pub fn user_id(data_dir: &Path) -> String {
    let cache = data_dir.join("user_id.txt");
    if let Ok(existing) = std::fs::read_to_string(&cache) {
        let trimmed = existing.trim();
        if trimmed.len() == ID_LEN && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return trimmed.to_string();
        }
    }

    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_string());
    let home = dirs::home_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let id = short_hash(&format!("{}{}", username, home));

    if let Err(e) = std::fs::create_dir_all(data_dir)
        .and_then(|_| std::fs::write(&cache, &id))
    {
        warn!(error = %e, "could not cache user id");
    }
    id
}

/// Derive the stable 16-hex-char hash for a project directory.
///
/// The path is canonicalized first so `.` and symlinked spellings of the
/// same project map to the same hash. Falls back to the raw path when the
/// directory does not exist.
pub fn project_hash(path: &Path) -> String {
    let canonical: PathBuf = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    short_hash(&canonical.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash_length_and_stability() {
        let a = short_hash("alice/home/alice");
        let b = short_hash("alice/home/alice");
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_distinct_inputs_distinct_hashes() {
        assert_ne!(short_hash("alice"), short_hash("bob"));
    }

    #[test]
    fn test_user_id_cached_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let first = user_id(dir.path());
        let second = user_id(dir.path());
        assert_eq!(first, second);
        assert!(dir.path().join("user_id.txt").exists());
    }

    #[test]
    fn test_corrupt_cache_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("user_id.txt"), "not-hex!").unwrap();
        let id = user_id(dir.path());
        assert_eq!(id.len(), ID_LEN);
    }

    #[test]
    fn test_project_hash_same_for_same_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(project_hash(dir.path()), project_hash(dir.path()));
    }
}
