use qamoos_core::DictConfigSnapshot;

use crate::types::MediaKind;

pub const DEFAULT_FOLDER: &str = "pashto_dict";
pub const DEFAULT_IMAGE_MAX_BYTES: u64 = 100 * 1024;
pub const DEFAULT_AUDIO_MAX_BYTES: u64 = 200 * 1024;

/// Limits and placement applied to every ingested file.
#[derive(Debug, Clone)]
pub struct IngestRules {
    /// Inclusive size ceiling for images
    pub image_max_bytes: u64,

    /// Inclusive size ceiling for audio
    pub audio_max_bytes: u64,

    /// Remote folder every upload lands in
    pub folder: String,

    /// Audio source extensions the store is asked to convert to mp3
    pub mp3_sources: Vec<String>,
}

impl Default for IngestRules {
    fn default() -> Self {
        Self {
            image_max_bytes: DEFAULT_IMAGE_MAX_BYTES,
            audio_max_bytes: DEFAULT_AUDIO_MAX_BYTES,
            folder: DEFAULT_FOLDER.to_string(),
            mp3_sources: vec!["webm".to_string()],
        }
    }
}

impl IngestRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `media.*` keys, keeping defaults for anything unset or unparsable.
    pub fn from_config(config: &DictConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            image_max_bytes: config
                .get_u64("media.image.max_bytes")
                .unwrap_or(defaults.image_max_bytes),
            audio_max_bytes: config
                .get_u64("media.audio.max_bytes")
                .unwrap_or(defaults.audio_max_bytes),
            folder: config
                .get_string("media.folder")
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(defaults.folder),
            mp3_sources: config
                .get_list("media.audio.mp3_sources")
                .map(|list| list.into_iter().map(|e| e.to_ascii_lowercase()).collect())
                .unwrap_or(defaults.mp3_sources),
        }
    }

    pub fn with_image_max_bytes(mut self, bytes: u64) -> Self {
        self.image_max_bytes = bytes;
        self
    }

    pub fn with_audio_max_bytes(mut self, bytes: u64) -> Self {
        self.audio_max_bytes = bytes;
        self
    }

    pub fn with_folder<S: Into<String>>(mut self, folder: S) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn limit_for(&self, kind: MediaKind) -> u64 {
        match kind {
            MediaKind::Image => self.image_max_bytes,
            MediaKind::Audio => self.audio_max_bytes,
        }
    }

    pub fn converts_to_mp3(&self, extension: &str) -> bool {
        self.mp3_sources
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qamoos_core::DictConfig;

    #[test]
    fn defaults_match_kilobyte_ceilings() {
        let rules = IngestRules::default();
        assert_eq!(rules.limit_for(MediaKind::Image), 102_400);
        assert_eq!(rules.limit_for(MediaKind::Audio), 204_800);
        assert_eq!(rules.folder, "pashto_dict");
    }

    #[test]
    fn config_overrides_limits() {
        let mut cfg = DictConfig::new();
        cfg.set("media.image.max_bytes", "2048");
        cfg.set("media.folder", "  ");
        cfg.set("media.audio.mp3_sources", "WEBM,ogg");
        let rules = IngestRules::from_config(&cfg.snapshot());
        assert_eq!(rules.image_max_bytes, 2048);
        assert_eq!(rules.audio_max_bytes, DEFAULT_AUDIO_MAX_BYTES);
        assert_eq!(rules.folder, DEFAULT_FOLDER);
        assert!(rules.converts_to_mp3("ogg"));
        assert!(rules.converts_to_mp3("webm"));
    }
}
