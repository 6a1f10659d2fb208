//! Configuration management for volume-mirror
//!
//! Describes the simulated audio surface the binary runs against and the
//! channels it watches. Loaded from YAML.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;

use crate::channel::{ChannelKey, RingerMode};
use crate::events::LocalChangeSource;
use crate::surface::{ChannelState, SimulatedSurface};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MirrorConfig {
    pub surface: SurfaceConfig,
    /// Channels subscribed to at startup
    #[serde(default)]
    pub watch: Vec<ChannelKey>,
}

/// Simulated surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_surface_name")]
    pub name: String,
    #[serde(default = "default_ringer_mode")]
    pub ringer_mode: RingerMode,
    /// Notification policy access (false => ringer writes are denied)
    #[serde(default = "default_true")]
    pub policy_access: bool,
    pub channels: Vec<ChannelConfig>,
}

/// One channel of the simulated surface
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub channel: ChannelKey,
    #[serde(flatten)]
    pub state: ChannelState,
}

impl MirrorConfig {
    /// Load configuration from a YAML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: MirrorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.surface.channels.is_empty() {
            anyhow::bail!("At least one surface channel must be defined");
        }

        let mut seen = HashSet::new();
        for entry in &self.surface.channels {
            let state = &entry.state;
            if !seen.insert(entry.channel) {
                anyhow::bail!("Channel {} defined more than once", entry.channel);
            }
            if state.min > state.max {
                anyhow::bail!(
                    "Channel {}: min ({}) is greater than max ({})",
                    entry.channel,
                    state.min,
                    state.max
                );
            }
            if state.volume < state.min || state.volume > state.max {
                anyhow::bail!(
                    "Channel {}: volume {} outside [{}, {}]",
                    entry.channel,
                    state.volume,
                    state.min,
                    state.max
                );
            }
        }

        for channel in &self.watch {
            if !seen.contains(channel) {
                anyhow::bail!("Watched channel {} is not defined on the surface", channel);
            }
        }

        Ok(())
    }

    /// Build the simulated surface described by this config
    pub fn build_surface(&self, events: Arc<LocalChangeSource>) -> SimulatedSurface {
        self.surface
            .channels
            .iter()
            .fold(
                SimulatedSurface::new(self.surface.name.clone(), events),
                |surface, entry| surface.with_channel(entry.channel, entry.state),
            )
            .with_ringer_mode(self.surface.ringer_mode)
            .with_policy_access(self.surface.policy_access)
    }
}

impl Default for MirrorConfig {
    fn default() -> Self {
        let entry = |channel: ChannelKey, volume: i32, min: i32, max: i32| ChannelConfig {
            channel,
            state: ChannelState::new(volume, min, max),
        };

        Self {
            surface: SurfaceConfig {
                name: default_surface_name(),
                ringer_mode: default_ringer_mode(),
                policy_access: true,
                channels: vec![
                    entry(ChannelKey::VOICE_CALL, 4, 1, 5),
                    entry(ChannelKey::RING, 5, 0, 7),
                    entry(ChannelKey::MUSIC, 7, 0, 15),
                    entry(ChannelKey::ALARM, 6, 1, 7),
                    entry(ChannelKey::NOTIFICATION, 5, 0, 7),
                ],
            },
            watch: vec![ChannelKey::MUSIC, ChannelKey::RING],
        }
    }
}

fn default_surface_name() -> String {
    "simulated".to_string()
}

fn default_ringer_mode() -> RingerMode {
    RingerMode::Normal
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ControlSurface;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
surface:
  ringer_mode: vibrate
  policy_access: false
  channels:
    - channel: music
      volume: 7
      max: 15
    - channel: 2
      volume: 3
      min: 0
      max: 7
      muted: true
watch: [music]
"#;

    #[tokio::test]
    async fn test_load_config() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("mirror.yaml");
        std::fs::write(&path, SAMPLE)?;

        let config = MirrorConfig::load(&path).await?;
        assert_eq!(config.surface.name, "simulated");
        assert_eq!(config.surface.ringer_mode, RingerMode::Vibrate);
        assert!(!config.surface.policy_access);
        assert_eq!(config.surface.channels.len(), 2);
        assert_eq!(config.surface.channels[1].channel, ChannelKey::RING);
        assert!(config.surface.channels[1].state.muted);
        assert_eq!(config.watch, vec![ChannelKey::MUSIC]);
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_reload() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("saved.yaml");

        let config = MirrorConfig::default();
        config.save(&path).await?;
        let reloaded = MirrorConfig::load(&path).await?;

        assert_eq!(reloaded.surface.channels.len(), config.surface.channels.len());
        assert_eq!(reloaded.watch, config.watch);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let result = MirrorConfig::load("/definitely/not/here.yaml").await;
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let mut config = MirrorConfig::default();
        config.surface.channels[0].state.volume = 99;
        assert!(config.validate().is_err());

        let mut config = MirrorConfig::default();
        config.surface.channels[0].state.min = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicates_and_unknown_watch() {
        let mut config = MirrorConfig::default();
        let dup = config.surface.channels[0].clone();
        config.surface.channels.push(dup);
        assert!(config.validate().is_err());

        let mut config = MirrorConfig::default();
        config.watch.push(ChannelKey::DTMF);
        assert!(config.validate().is_err());

        let mut config = MirrorConfig::default();
        config.surface.channels.clear();
        config.watch.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_surface() {
        let config: MirrorConfig = serde_yaml::from_str(SAMPLE).unwrap();
        let surface = config.build_surface(Arc::new(LocalChangeSource::default()));

        assert_eq!(surface.channels(), vec![ChannelKey::RING, ChannelKey::MUSIC]);
        assert_eq!(surface.read_volume(ChannelKey::RING).unwrap(), 3);
        assert!(surface.read_mute(ChannelKey::RING).unwrap());
        assert_eq!(surface.read_ringer_mode().unwrap(), RingerMode::Vibrate);
        assert!(surface.write_ringer_mode(RingerMode::Silent).is_err());
    }
}
