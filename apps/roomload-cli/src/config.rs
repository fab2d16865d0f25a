use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use roomload_core::RunParameters;
use roomload_session::SimulationConfig;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// Resolved settings for one `roomload` invocation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoadConfig {
    pub url: String,
    pub room: Option<String>,
    pub video_publishers: usize,
    pub audio_publishers: usize,
    pub subscribers: usize,
    pub video_resolution: String,
    pub video_codec: String,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub num_per_second: f64,
    pub simulcast: bool,
    pub simulate_speakers: bool,
    #[serde(with = "humantime_serde")]
    pub speaker_interval: Duration,
    pub sim_loss_ratio: f64,
    #[serde(deserialize_with = "deserialize_list")]
    pub sim_fail_participants: Vec<String>,
}

/// Command-line overrides; each one set wins over file and environment.
#[derive(Debug, Default, Clone, Args)]
pub struct RunOverrides {
    /// Service URL, e.g. ws://localhost:7880
    #[arg(long)]
    pub url: Option<String>,
    /// Room to join; a random testroom<N> is used when unset
    #[arg(long)]
    pub room: Option<String>,
    #[arg(long)]
    pub video_publishers: Option<u64>,
    #[arg(long)]
    pub audio_publishers: Option<u64>,
    #[arg(long)]
    pub subscribers: Option<u64>,
    /// high, medium or low
    #[arg(long)]
    pub video_resolution: Option<String>,
    /// h264 or vp8
    #[arg(long)]
    pub video_codec: Option<String>,
    /// How long to run, e.g. 30s or 5m; 0s runs until interrupted
    #[arg(long)]
    pub duration: Option<String>,
    /// Participants admitted per second (at most 10)
    #[arg(long)]
    pub num_per_second: Option<f64>,
    #[arg(long)]
    pub simulcast: Option<bool>,
    #[arg(long)]
    pub simulate_speakers: Option<bool>,
    #[arg(long)]
    pub speaker_interval: Option<String>,
    /// Packet loss ratio injected by the simulated backend
    #[arg(long)]
    pub sim_loss_ratio: Option<f64>,
    /// Comma-separated display names whose connection fails
    #[arg(long)]
    pub sim_fail_participants: Option<String>,
}

impl RunOverrides {
    fn apply(
        &self,
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        builder
            .set_override_option("url", self.url.clone())?
            .set_override_option("room", self.room.clone())?
            .set_override_option("video_publishers", self.video_publishers)?
            .set_override_option("audio_publishers", self.audio_publishers)?
            .set_override_option("subscribers", self.subscribers)?
            .set_override_option("video_resolution", self.video_resolution.clone())?
            .set_override_option("video_codec", self.video_codec.clone())?
            .set_override_option("duration", self.duration.clone())?
            .set_override_option("num_per_second", self.num_per_second)?
            .set_override_option("simulcast", self.simulcast)?
            .set_override_option("simulate_speakers", self.simulate_speakers)?
            .set_override_option("speaker_interval", self.speaker_interval.clone())?
            .set_override_option("sim_loss_ratio", self.sim_loss_ratio)?
            .set_override_option("sim_fail_participants", self.sim_fail_participants.clone())
    }
}

fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a sequence of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(split_list(value))
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(element) = seq.next_element()? {
                vec.push(element);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(ListVisitor)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl LoadConfig {
    pub fn new(
        config_path: Option<PathBuf>,
        overrides: &RunOverrides,
    ) -> Result<Self, ConfigError> {
        let defaults = RunParameters::default();
        let mut builder = Config::builder()
            .set_default("url", defaults.url)?
            .set_default("room", None::<String>)?
            .set_default("video_publishers", 0)?
            .set_default("audio_publishers", 0)?
            .set_default("subscribers", 0)?
            .set_default("video_resolution", defaults.video_resolution)?
            .set_default("video_codec", defaults.video_codec)?
            .set_default("duration", "0s")?
            .set_default("num_per_second", defaults.num_per_second)?
            .set_default("simulcast", defaults.simulcast)?
            .set_default("simulate_speakers", defaults.simulate_speakers)?
            .set_default("speaker_interval", "5s")?
            .set_default("sim_loss_ratio", 0.0)?
            .set_default("sim_fail_participants", Vec::<String>::new())?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // .env files feed the ROOMLOAD_* environment source below.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix("ROOMLOAD").try_parsing(true));
        builder = overrides.apply(builder)?;

        let cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.speaker_interval.is_zero() {
            return Err(ConfigError::Message(
                "speaker_interval must be greater than zero".to_string(),
            ));
        }
        Ok(cfg)
    }

    pub fn run_parameters(&self) -> RunParameters {
        RunParameters {
            url: self.url.clone(),
            video_publishers: self.video_publishers,
            audio_publishers: self.audio_publishers,
            subscribers: self.subscribers,
            video_resolution: self.video_resolution.clone(),
            video_codec: self.video_codec.clone(),
            duration: self.duration,
            num_per_second: self.num_per_second,
            simulcast: self.simulcast,
            simulate_speakers: self.simulate_speakers,
            room: self.room.clone().filter(|room| !room.is_empty()),
        }
    }

    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            loss_ratio: self.sim_loss_ratio,
            fail_start: self.sim_fail_participants.iter().cloned().collect::<HashSet<_>>(),
            ..SimulationConfig::default()
        }
    }
}
