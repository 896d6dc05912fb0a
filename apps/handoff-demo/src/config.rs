//! Demo configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use handoff_core::{ContentLocator, CoreConfig, DetachPolicy, MediaDescriptor};
use serde::Deserialize;

/// Demo configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Core player settings (polling, queue cache, event channel).
    pub core: CoreConfig,

    /// Number of items seeded on the receiver for the queue phase.
    /// Override: `HANDOFF_REMOTE_QUEUE_LENGTH`
    pub remote_queue_length: usize,

    /// Pause between scenario steps, in milliseconds.
    /// Override: `HANDOFF_STEP_DELAY_MS`
    pub step_delay_ms: u64,

    /// Media played and enqueued by the scenario. The first entry is played.
    pub catalog: Vec<MediaDescriptor>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            remote_queue_length: 100,
            step_delay_ms: 250,
            catalog: default_catalog(),
        }
    }
}

fn default_catalog() -> Vec<MediaDescriptor> {
    vec![
        MediaDescriptor::new(
            ContentLocator::Url("https://media.example.com/big-buck-bunny.mp4".into()),
            "video/mp4",
            "Big Buck Bunny",
        )
        .with_subtitle("Blender Foundation")
        .with_duration_ms(596_000),
        MediaDescriptor::new(
            ContentLocator::Url("https://media.example.com/sintel.mp4".into()),
            "video/mp4",
            "Sintel",
        )
        .with_subtitle("Blender Foundation")
        .with_duration_ms(888_000),
        MediaDescriptor::new(
            ContentLocator::Entity("radio:lofi-beats".into()),
            "audio/mpeg",
            "Lo-fi Radio",
        ),
    ]
}

impl DemoConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config: Self = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        config.core.validate().context("Invalid core configuration")?;
        if config.catalog.is_empty() {
            anyhow::bail!("catalog must contain at least one entry");
        }
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HANDOFF_POSITION_POLL_INTERVAL_MS") {
            if let Ok(interval) = val.parse() {
                self.core.playback.position_poll_interval_ms = interval;
            }
        }

        if let Ok(val) = std::env::var("HANDOFF_CACHE_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                self.core.queue.cache_capacity = capacity;
            }
        }

        if let Ok(val) = std::env::var("HANDOFF_DETACH_POLICY") {
            match val.to_ascii_lowercase().as_str() {
                "freeze" => self.core.queue.detach_policy = DetachPolicy::Freeze,
                "discard" => self.core.queue.detach_policy = DetachPolicy::Discard,
                other => log::warn!("Ignoring unknown HANDOFF_DETACH_POLICY '{}'", other),
            }
        }

        if let Ok(val) = std::env::var("HANDOFF_REMOTE_QUEUE_LENGTH") {
            if let Ok(length) = val.parse() {
                self.remote_queue_length = length;
            }
        }

        // Note: HANDOFF_STEP_DELAY_MS is also accepted by clap in main.rs
        if let Ok(val) = std::env::var("HANDOFF_STEP_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                self.step_delay_ms = delay;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "core:\n  queue:\n    cache_capacity: 40\nstep_delay_ms: 10\n";
        let config: DemoConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.core.queue.cache_capacity, 40);
        assert_eq!(config.core.playback.position_poll_interval_ms, 1000);
        assert_eq!(config.step_delay_ms, 10);
        assert_eq!(config.catalog.len(), 3);
    }

    #[test]
    fn catalog_entries_parse() {
        let yaml = r#"
catalog:
  - locator: { kind: url, value: "https://example.com/a.mp4" }
    contentType: video/mp4
    title: A
    durationMs: 1000
"#;
        let config: DemoConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.catalog.len(), 1);
        assert_eq!(config.catalog[0].duration_ms, 1000);
        assert!(config.catalog[0].playable_locator().is_some());
    }
}
