use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Random nonce used to namespace per-question submitted locks so a lock
/// from a previous browser session cannot leak into a new one.
pub fn generate_session_nonce(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
