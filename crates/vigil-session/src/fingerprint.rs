use sha2::{Digest, Sha256};

/// Derive the device fingerprint bound at login: sha256 over the user
/// agent and source address. Stable for a given client environment, so a
/// later heartbeat from the same browser reproduces it.
pub fn device_fingerprint(user_agent: &str, ip_address: &str) -> String {
    let digest = Sha256::digest(format!("{user_agent}:{ip_address}").as_bytes());
    hex::encode(digest)
}
