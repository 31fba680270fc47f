use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::api::sync::Api;
use tokenizers::{Tokenizer, TruncationParams};

use crate::{
    config::{Overrides, Settings},
    embedding::Embedder,
    error::{Error, Result},
};

pub const DEFAULT_MODEL_ID: &str = "BAAI/bge-small-en-v1.5";
pub const MODEL_ENV_VAR: &str = "MATHSEARCH_MODEL";

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

struct LoadedModel {
    bert: BertModel,
    tokenizer: Tokenizer,
    dimension: usize,
    device: Device,
}

/// Manages a BERT sentence encoder, loading it on first use.
///
/// Embeddings use the CLS token of the last hidden state, L2-normalized,
/// which is how the BGE family is meant to be pooled.
pub struct ModelManager {
    model: Option<LoadedModel>,
    model_id: String,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager` for the model named by
    /// [`Settings::resolve`] without command line overrides: the
    /// `MATHSEARCH_MODEL` environment variable, else `BAAI/bge-small-en-v1.5`.
    ///
    /// Nothing is downloaded or loaded until the first call to `embed` or
    /// `dimension`.
    pub fn new() -> Self {
        Self::with_model_id(Settings::resolve(Overrides::default()).model_id)
    }

    /// Creates a `ModelManager` with an explicit model ID or local model
    /// directory, bypassing environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: None,
            model_id,
        }
    }

    /// Returns `true` if the model has already been loaded into memory.
    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn ensure_loaded(&mut self) -> Result<&mut LoadedModel> {
        let model = match self.model.take() {
            Some(model) => model,
            None => load_model(&self.model_id)?,
        };
        Ok(self.model.insert(model))
    }
}

/// Resolve the model files, either from a local directory or the Hub.
fn model_files(model_id: &str) -> Result<(PathBuf, PathBuf, PathBuf)> {
    let local = Path::new(model_id);
    if local.is_dir() {
        return Ok((
            local.join(CONFIG_FILE),
            local.join(TOKENIZER_FILE),
            local.join(WEIGHTS_FILE),
        ));
    }

    let repo = Api::new()?.model(model_id.to_string());
    Ok((
        repo.get(CONFIG_FILE)?,
        repo.get(TOKENIZER_FILE)?,
        repo.get(WEIGHTS_FILE)?,
    ))
}

fn load_model(model_id: &str) -> Result<LoadedModel> {
    tracing::debug!(model = model_id, "loading embedding model");

    let (config_path, tokenizer_path, weights_path) = model_files(model_id)?;
    let config: Config =
        serde_json::from_str(&std::fs::read_to_string(config_path)?)?;

    let mut tokenizer = Tokenizer::from_file(tokenizer_path)
        .map_err(|e| Error::Tokenizer(e.to_string()))?;
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: config.max_position_embeddings,
            ..Default::default()
        }))
        .map_err(|e| Error::Tokenizer(e.to_string()))?;

    let device = default_device();
    // SAFETY: the weights file is not modified while it is mapped.
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)?
    };
    let bert = BertModel::load(vb, &config)?;

    tracing::info!(
        model = model_id,
        dimension = config.hidden_size,
        "embedding model ready"
    );

    Ok(LoadedModel {
        bert,
        tokenizer,
        dimension: config.hidden_size,
        device,
    })
}

impl Embedder for ModelManager {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&mut self) -> Result<usize> {
        Ok(self.ensure_loaded()?.dimension)
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        let model = self.ensure_loaded()?;

        let encoding = model
            .tokenizer
            .encode(text, true)
            .map_err(|e| Error::Tokenizer(e.to_string()))?;

        let input_ids =
            Tensor::new(encoding.get_ids(), &model.device)?.unsqueeze(0)?;
        let token_type_ids = input_ids.zeros_like()?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &model.device)?
                .unsqueeze(0)?;

        // [1, tokens, hidden] -> CLS row [hidden]
        let hidden = model.bert.forward(
            &input_ids,
            &token_type_ids,
            Some(&attention_mask),
        )?;
        let cls = hidden.get(0)?.get(0)?.to_vec1::<f32>()?;

        Ok(l2_normalize(cls))
    }
}

fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}
