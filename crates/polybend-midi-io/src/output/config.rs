//! Serializable output configuration.

use serde::{Deserialize, Serialize};

use polybend_midi::ChannelId;

use crate::error::{Error, Result};

/// Default pitch-bend range in semitones.
pub const DEFAULT_BEND_RANGE: u8 = 2;

/// Channels and bend range for a [`MicrotonalOutput`](super::MicrotonalOutput).
///
/// Channels are 1-based and their order is the voice pool order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub channels: Vec<u8>,
    pub bend_range_semitones: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            bend_range_semitones: DEFAULT_BEND_RANGE,
        }
    }
}

impl OutputConfig {
    pub fn new(channels: impl IntoIterator<Item = u8>) -> Self {
        Self {
            channels: channels.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_bend_range(mut self, semitones: u8) -> Self {
        self.bend_range_semitones = semitones;
        self
    }

    /// Checks the configuration and returns the channels in pool order.
    pub fn validate(&self) -> Result<Vec<ChannelId>> {
        if !(1..=127).contains(&self.bend_range_semitones) {
            return Err(Error::InvalidConfig(format!(
                "pitch-bend range must be 1-127 semitones, got {}",
                self.bend_range_semitones
            )));
        }

        let mut channels: Vec<ChannelId> = Vec::with_capacity(self.channels.len());
        for &raw in &self.channels {
            let channel = ChannelId::new(raw).ok_or_else(|| {
                Error::InvalidConfig(format!("channel {raw} is outside 1-16"))
            })?;
            if channels.contains(&channel) {
                return Err(Error::InvalidConfig(format!(
                    "channel {raw} is listed more than once"
                )));
            }
            channels.push(channel);
        }
        Ok(channels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OutputConfig::default();
        assert!(config.channels.is_empty());
        assert_eq!(config.bend_range_semitones, 2);
        assert_eq!(config.validate().unwrap(), Vec::new());
    }

    #[test]
    fn test_validate_keeps_order() {
        let config = OutputConfig::new([3, 1, 16]);
        let channels: Vec<u8> = config.validate().unwrap().iter().map(|c| c.get()).collect();
        assert_eq!(channels, vec![3, 1, 16]);
    }

    #[test]
    fn test_validate_rejects_bad_channels() {
        assert!(matches!(
            OutputConfig::new([0]).validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            OutputConfig::new([17]).validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            OutputConfig::new([2, 5, 2]).validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_bend_range() {
        let config = OutputConfig::new([1]).with_bend_range(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        assert!(OutputConfig::new([1]).with_bend_range(48).validate().is_ok());
    }

    #[test]
    fn test_bincode_roundtrip() {
        let config = OutputConfig::new([1, 2, 3]).with_bend_range(12);
        let bytes = bincode::serialize(&config).unwrap();
        let back: OutputConfig = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, config);
    }
}
