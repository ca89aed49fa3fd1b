//! Session assignment collaborator seam

/// Maps a requested session onto the session that will serve it
pub trait SessionAssigner: Send + Sync {
    /// Effective session id for `session_id` handled by `consultant_id`
    fn assign_session(&self, session_id: &str, consultant_id: &str) -> String;
}

/// Keeps the requested session id
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughAssigner;

impl SessionAssigner for PassthroughAssigner {
    fn assign_session(&self, session_id: &str, _consultant_id: &str) -> String {
        session_id.to_string()
    }
}

/// Spreads sessions over a fixed number of shards
#[derive(Debug, Clone, Copy)]
pub struct ShardedAssigner {
    shards: u32,
}

impl ShardedAssigner {
    /// Create with `shards` shards, at least one
    #[must_use]
    pub fn new(shards: u32) -> Self {
        Self {
            shards: shards.max(1),
        }
    }
}

impl SessionAssigner for ShardedAssigner {
    fn assign_session(&self, session_id: &str, consultant_id: &str) -> String {
        let digest = blake3::hash(format!("{consultant_id}:{session_id}").as_bytes());
        let bytes = digest.as_bytes();
        let shard = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) % self.shards;
        format!("{session_id}@{shard}")
    }
}
