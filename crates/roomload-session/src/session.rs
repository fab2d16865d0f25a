use std::sync::Arc;

use async_trait::async_trait;
use roomload_stats::ParticipantStats;

use crate::error::SessionError;

/// Everything a backend needs to join one participant to the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Display name used in reports, e.g. `Pub 3`.
    pub name: String,
    pub url: String,
    pub room: String,
    /// Unique identity inside the room.
    pub identity: String,
    /// Spawn ordinal.
    pub sequence: usize,
    /// Whether the participant subscribes to remote tracks.
    pub subscribe: bool,
    pub expected_tracks: usize,
}

/// One simulated participant connected to the service under test.
#[async_trait]
pub trait ParticipantSession: Send + Sync {
    /// Connects to the room.
    async fn start(&self) -> Result<(), SessionError>;

    /// Publishes an audio track, returning its track id.
    async fn publish_audio_track(&self, label: &str) -> Result<String, SessionError>;

    /// Publishes a single-layer video track, returning its track id.
    async fn publish_video_track(
        &self,
        label: &str,
        resolution: &str,
        codec: &str,
    ) -> Result<String, SessionError>;

    /// Publishes a simulcast video track, returning its track id.
    async fn publish_simulcast_track(
        &self,
        label: &str,
        resolution: &str,
        codec: &str,
    ) -> Result<String, SessionError>;

    /// Marks the participant as an active speaker or silent.
    async fn set_speaking(&self, speaking: bool) -> Result<(), SessionError>;

    /// Disconnects and stops all delivery. Must be safe to call on a
    /// session that never started.
    async fn stop(&self);

    /// Counters for every track this participant observed.
    fn stats(&self) -> Arc<ParticipantStats>;
}

/// Creates sessions for the orchestrator, one per admitted participant.
pub trait SessionFactory: Send + Sync {
    fn create(&self, params: SessionParams) -> Arc<dyn ParticipantSession>;
}
