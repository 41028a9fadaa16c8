use anyhow::{Context, Result};

use crate::runtime::CompressorSettings;

/// Raw form field values as typed by the user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub threshold: String,
    pub ratio: String,
    pub attack: String,
    pub release: String,
    pub gain: String,
}

impl SettingsForm {
    /// Parse every field as a number
    pub fn parse(&self) -> Result<CompressorSettings> {
        Ok(CompressorSettings {
            threshold: parse_field("threshold", &self.threshold)?,
            ratio: parse_field("ratio", &self.ratio)?,
            attack: parse_field("attack", &self.attack)?,
            release: parse_field("release", &self.release)?,
            gain: parse_field("gain", &self.gain)?,
        })
    }
}

impl From<CompressorSettings> for SettingsForm {
    fn from(settings: CompressorSettings) -> Self {
        Self {
            threshold: settings.threshold.to_string(),
            ratio: settings.ratio.to_string(),
            attack: settings.attack.to_string(),
            release: settings.release.to_string(),
            gain: settings.gain.to_string(),
        }
    }
}

fn parse_field(name: &str, raw: &str) -> Result<f32> {
    raw.trim()
        .parse::<f32>()
        .with_context(|| format!("{} is not a number: {:?}", name, raw))
}
