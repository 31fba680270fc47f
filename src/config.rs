use std::path::{Path, PathBuf};

use crate::model_manager::{DEFAULT_MODEL_ID, MODEL_ENV_VAR};

pub const DEFAULT_COLLECTION: &str = "math_problems";
pub const DEFAULT_CORPUS_ROOT: &str = "./train";
pub const COLLECTION_ENV_VAR: &str = "MATHSEARCH_COLLECTION";
pub const CORPUS_ENV_VAR: &str = "MATHSEARCH_CORPUS";

/// Static settings shared by ingestion and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model_id: String,
    pub collection: String,
    pub corpus_root: PathBuf,
}

/// Values given on the command line; these win over everything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    pub model: Option<&'a str>,
    pub collection: Option<&'a str>,
    pub corpus_root: Option<&'a Path>,
}

impl Settings {
    /// Resolve settings as command line > environment > defaults.
    pub fn resolve(overrides: Overrides<'_>) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Like [`Settings::resolve`], reading the environment through `env`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mathsearch::config::{Overrides, Settings};
    ///
    /// let settings = Settings::resolve_with(
    ///     Overrides { collection: Some("olympiad"), ..Default::default() },
    ///     |_| None,
    /// );
    /// assert_eq!(settings.collection, "olympiad");
    /// assert_eq!(settings.model_id, "BAAI/bge-small-en-v1.5");
    /// ```
    pub fn resolve_with(
        overrides: Overrides<'_>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let model_id = overrides
            .model
            .map(str::to_string)
            .or_else(|| env(MODEL_ENV_VAR))
            .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string());

        let collection = overrides
            .collection
            .map(str::to_string)
            .or_else(|| env(COLLECTION_ENV_VAR))
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());

        let corpus_root = overrides
            .corpus_root
            .map(Path::to_path_buf)
            .or_else(|| env(CORPUS_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_ROOT));

        Self {
            model_id,
            collection,
            corpus_root,
        }
    }
}
