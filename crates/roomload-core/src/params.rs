use std::time::Duration;

use url::Url;

use crate::error::SetupError;
use crate::types::ParticipantRole;

/// Hosting domain where large load tests are refused.
pub const MANAGED_HOST_SUFFIX: &str = ".livekit.cloud";
/// Maximum participants per category accepted against the managed domain.
pub const MANAGED_HOST_PARTICIPANT_LIMIT: usize = 50;

pub const VIDEO_RESOLUTIONS: &[&str] = &["high", "medium", "low"];
pub const VIDEO_CODECS: &[&str] = &["h264", "vp8"];

/// Per-run load configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParameters {
    pub url: String,
    pub video_publishers: usize,
    pub audio_publishers: usize,
    pub subscribers: usize,
    pub video_resolution: String,
    pub video_codec: String,
    /// Zero means run until cancelled.
    pub duration: Duration,
    /// Participants admitted per second; clamped by the admission pacer.
    pub num_per_second: f64,
    pub simulcast: bool,
    pub simulate_speakers: bool,
    /// Generated per run when absent.
    pub room: Option<String>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            url: "http://localhost:7880".to_string(),
            video_publishers: 0,
            audio_publishers: 0,
            subscribers: 0,
            video_resolution: "high".to_string(),
            video_codec: "h264".to_string(),
            duration: Duration::ZERO,
            num_per_second: 5.0,
            simulcast: true,
            simulate_speakers: false,
            room: None,
        }
    }
}

impl RunParameters {
    /// Falls back to one video publisher and one subscriber when no
    /// participants were requested at all.
    pub fn with_default_counts(mut self) -> Self {
        if self.video_publishers == 0 && self.audio_publishers == 0 && self.subscribers == 0 {
            self.video_publishers = 1;
            self.subscribers = 1;
        }
        self
    }

    /// Highest publisher ordinal bound; audio and video publishers share
    /// ordinals starting from zero.
    pub fn max_publishers(&self) -> usize {
        self.video_publishers.max(self.audio_publishers)
    }

    /// Total number of participants a run spawns.
    pub fn participant_count(&self) -> usize {
        self.max_publishers() + self.subscribers
    }

    /// Tracks every subscriber should receive.
    pub fn published_tracks(&self) -> usize {
        self.video_publishers + self.audio_publishers
    }

    pub fn role_for(&self, ordinal: usize) -> ParticipantRole {
        ParticipantRole::for_ordinal(ordinal, self.video_publishers, self.audio_publishers)
    }

    /// Checks the target address and media settings before anything is
    /// spawned. Returns the parsed target on success.
    pub fn validate(&self) -> Result<Url, SetupError> {
        let url = Url::parse(&self.url).map_err(|err| SetupError::InvalidUrl {
            url: self.url.clone(),
            reason: err.to_string(),
        })?;

        if let Some(host) = url.host_str() {
            if host.ends_with(MANAGED_HOST_SUFFIX) {
                let largest = self
                    .video_publishers
                    .max(self.audio_publishers)
                    .max(self.subscribers);
                if largest > MANAGED_HOST_PARTICIPANT_LIMIT {
                    return Err(SetupError::ManagedHostLimit {
                        host: host.to_string(),
                        limit: MANAGED_HOST_PARTICIPANT_LIMIT,
                    });
                }
            }
        }

        if !VIDEO_RESOLUTIONS.contains(&self.video_resolution.as_str()) {
            return Err(SetupError::InvalidParameter {
                name: "video_resolution",
                reason: format!("unknown resolution {}", self.video_resolution),
            });
        }
        if !VIDEO_CODECS.contains(&self.video_codec.as_str()) {
            return Err(SetupError::InvalidParameter {
                name: "video_codec",
                reason: format!("unknown codec {}", self.video_codec),
            });
        }
        Ok(url)
    }

    /// Human-readable participant mix, e.g. `2 video publishers, 10 subscribers`.
    pub fn describe_participants(&self) -> String {
        let mut parts = Vec::new();
        if self.video_publishers > 0 {
            parts.push(format!("{} video publishers", self.video_publishers));
        }
        if self.audio_publishers > 0 {
            parts.push(format!("{} audio publishers", self.audio_publishers));
        }
        if self.subscribers > 0 {
            parts.push(format!("{} subscribers", self.subscribers));
        }
        parts.join(", ")
    }
}
