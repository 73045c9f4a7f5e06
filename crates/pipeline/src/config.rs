//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use splicer_common::config::{config_file_path, load_or_default, save_config, LoggingConfig};
use splicer_common::error::{SplicerError, SplicerResult};
use splicer_composition_core::{CompositionEngine, CompositionPreset, EngineConfig};

use crate::subtitles::SubtitleConfig;

/// Everything the pipeline reads from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Named preset; replaces `engine` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preset: Option<CompositionPreset>,

    /// Explicit engine configuration.
    pub engine: EngineConfig,

    /// Subtitle export.
    pub subtitles: SubtitleConfig,

    /// Logging.
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Load from the standard location or return defaults.
    pub fn load() -> Self {
        load_or_default(&config_file_path())
    }

    /// Save to the standard location.
    pub fn save(&self) -> SplicerResult<()> {
        save_config(self, &config_file_path())?;
        Ok(())
    }

    /// The engine configuration in effect.
    pub fn effective_engine(&self) -> EngineConfig {
        match self.preset {
            Some(preset) => preset.config(),
            None => self.engine.clone(),
        }
    }

    /// Build a composition engine from this configuration.
    pub fn engine(&self) -> SplicerResult<CompositionEngine> {
        CompositionEngine::new(self.effective_engine())
            .map_err(|e| SplicerError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splicer_composition_core::OverlapPolicy;

    #[test]
    fn test_preset_overrides_engine() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"preset":"action_packed","engine":{"envelope":{"duck_volume":0.9}}}"#,
        )
        .unwrap();
        let engine = config.effective_engine();
        assert_eq!(engine, CompositionPreset::ActionPacked.config());
        assert!(config.engine().is_ok());
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"subtitles":{"max_words_per_cue":3}}"#).unwrap();
        assert_eq!(config.subtitles.max_words_per_cue, 3);
        assert_eq!(config.effective_engine(), EngineConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_invalid_engine_config_is_a_config_error() {
        let mut config = PipelineConfig::default();
        config.engine.scheduler.policy = OverlapPolicy::Fixed { secs: -1.0 };
        assert!(matches!(config.engine(), Err(SplicerError::Config { .. })));
    }
}
