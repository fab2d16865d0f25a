use std::fmt;

/// Media kind carried by a published or subscribed track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Single-letter suffix used in generated track labels (`"3A"`, `"3V"`).
    pub fn label_suffix(self) -> char {
        match self {
            MediaKind::Audio => 'A',
            MediaKind::Video => 'V',
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// Role a participant plays in one run, derived from its ordinal.
///
/// A publisher may publish audio, video, or both from the same identity;
/// publishers never subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    Publisher { video: bool, audio: bool },
    Subscriber,
}

impl ParticipantRole {
    /// Derives the role of `ordinal` against the configured publisher counts.
    pub fn for_ordinal(ordinal: usize, video_publishers: usize, audio_publishers: usize) -> Self {
        let video = ordinal < video_publishers;
        let audio = ordinal < audio_publishers;
        if video || audio {
            ParticipantRole::Publisher { video, audio }
        } else {
            ParticipantRole::Subscriber
        }
    }

    pub fn is_publisher(self) -> bool {
        matches!(self, ParticipantRole::Publisher { .. })
    }

    pub fn publishes_video(self) -> bool {
        matches!(self, ParticipantRole::Publisher { video: true, .. })
    }

    pub fn publishes_audio(self) -> bool {
        matches!(self, ParticipantRole::Publisher { audio: true, .. })
    }

    /// Number of remote tracks this role should end up receiving.
    pub fn expected_tracks(self, published_tracks: usize) -> usize {
        match self {
            ParticipantRole::Publisher { .. } => 0,
            ParticipantRole::Subscriber => published_tracks,
        }
    }

    /// Display name used in logs and reports: `Pub <n>` or `Sub <n>`.
    ///
    /// Subscribers are numbered by their ordinal minus the video publisher
    /// count, so audio-only publisher slots shift subscriber numbers up.
    pub fn display_name(self, ordinal: usize, video_publishers: usize) -> String {
        match self {
            ParticipantRole::Publisher { .. } => format!("Pub {ordinal}"),
            ParticipantRole::Subscriber => {
                format!("Sub {}", ordinal.saturating_sub(video_publishers))
            }
        }
    }
}
