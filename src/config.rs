use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::corpus::CorpusOptions;
use crate::sentences::PhraseOptions;

/// Optional `.dupegate.toml`. Every key has a default, and command-line
/// flags win over file values.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub phrases: PhrasesConfig,
    #[serde(default)]
    pub similarity: SimilarityConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        CorpusConfig {
            extensions: default_extensions(),
            exclude: Vec::new(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["html".to_string(), "md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PhrasesConfig {
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default = "default_show")]
    pub show: usize,
}

impl Default for PhrasesConfig {
    fn default() -> Self {
        PhrasesConfig {
            min_words: default_min_words(),
            normalize: false,
            show: default_show(),
        }
    }
}

fn default_min_words() -> usize {
    6
}
fn default_show() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SimilarityConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        SimilarityConfig {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f64 {
    0.90
}

impl Config {
    /// Read `path` if it exists; a missing file means all defaults.
    pub fn load(path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no run could use. Also called after CLI overrides.
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.phrases.min_words == 0 {
            return Err("phrases.min_words must be > 0".into());
        }
        let t = self.similarity.threshold;
        if !t.is_finite() || t < 0.0 {
            return Err(
                format!("similarity threshold must be a non-negative number, got {}", t).into(),
            );
        }
        if self.corpus.extensions.is_empty() {
            return Err("corpus.extensions must list at least one extension".into());
        }
        Ok(())
    }

    pub fn corpus_options(&self) -> CorpusOptions {
        CorpusOptions {
            extensions: self.corpus.extensions.clone(),
            exclude: self.corpus.exclude.clone(),
        }
    }

    pub fn phrase_options(&self) -> PhraseOptions {
        PhraseOptions {
            min_words: self.phrases.min_words,
            normalize: self.phrases.normalize,
        }
    }
}
