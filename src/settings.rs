use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::assembler::AssemblerSettings;
use crate::error::Result;
use crate::pixelizer::PixelizerSettings;
use crate::sequencer::SequencerSettings;

/// Everything one pipeline invocation needs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Run the pipeline at all; disabled returns the input untouched (default: true)
    pub enabled: bool,
    pub pixelizer: PixelizerSettings,
    /// Split the pixelized image into sprites and animate them (default: false)
    pub make_sequence: bool,
    pub sequencer: SequencerSettings,
    pub assembler: AssemblerSettings,
    /// Replace the working image with the first frame of the written artifact (default: false)
    pub reload_artifact: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            pixelizer: PixelizerSettings::default(),
            make_sequence: false,
            sequencer: SequencerSettings::default(),
            assembler: AssemblerSettings::default(),
            reload_artifact: false,
        }
    }
}

impl PipelineSettings {
    /// Read settings from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: PipelineSettings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.pixelizer.validate()?;
        self.assembler.validate()?;
        Ok(())
    }
}
