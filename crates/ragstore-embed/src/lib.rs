//! Embedding collaborators for the retrieval engine.
//!
//! `ModelEmbedder` runs a local BERT-family sentence encoder (e.g.
//! all-MiniLM-L6-v2) on candle. `HashEmbedder` is a deterministic
//! feature-hashing stand-in for tests and offline development.

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use ragstore_core::config::{expand_path, EmbeddingConfig};
use ragstore_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub struct ModelEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, dim: usize, max_len: usize }

impl ModelEmbedder {
    pub fn new(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        info!("Loading sentence encoder from {}", model_dir.display());
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)?;
        let config: BertConfig = serde_json::from_str(&raw_config)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!("Sentence encoder ready (dim={}, max_len={})", dim, max_len);
        Ok(Self { model, tokenizer, device, dim, max_len })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if emb.len() != self.dim { return Err(anyhow!("encoder returned {} values, expected {}", emb.len(), self.dim)); }
        if start.elapsed().as_millis() > 100 { debug!("Slow embedding: {:?} for {} chars", start.elapsed(), text.len()); }
        Ok(emb)
    }
}

impl Embedder for ModelEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn embed_text(&self, text: &str) -> Result<Vec<f32>> { self.embed_text(text) }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() { return Ok(candle_core::safetensors::load(&safetensors, device)?); }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return weights.into_iter().map(|(name, t)| -> Result<(String, Tensor)> { Ok((name, t.to_device(device)?)) }).collect();
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Deterministic bag-of-tokens embedder: each whitespace token is hashed
/// into one of `dim` buckets, then the vector is L2-normalized.
pub struct HashEmbedder { dim: usize }

impl HashEmbedder { pub fn new(dim: usize) -> Self { Self { dim } } }

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize { self.dim }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher}; use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0); token.hash(&mut hasher); let h = hasher.finish();
            let idx = (h as usize) % self.dim; let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6); for x in &mut v { *x /= norm; } Ok(v)
    }
}

pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let forced = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
    if forced || config.use_fake { info!("Using HashEmbedder (dim={})", config.fake_dim); return Ok(Box::new(HashEmbedder::new(config.fake_dim))); }
    let model_dir = resolve_model_dir(config.model_dir.as_deref())?;
    Ok(Box::new(ModelEmbedder::new(&model_dir, config.max_len)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured { let p = expand_path(dir); if p.exists() { return Ok(p); } warn!("Configured model_dir {} does not exist", p.display()); }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) { let p = expand_path(&dir); if p.exists() { info!("Using {}: {}", var, p.display()); return Ok(p); } }
    }
    let default = Path::new("models/all-MiniLM-L6-v2"); if default.exists() { return Ok(default.to_path_buf()); }
    Err(anyhow!("Could not locate sentence encoder directory (set engine.embedding.model_dir or APP_MODEL_DIR)"))
}
