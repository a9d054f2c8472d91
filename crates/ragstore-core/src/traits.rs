use crate::types::Collection;

/// Text -> fixed-dimension vector. Must be deterministic and dimension-stable
/// for a given model configuration.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>>;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Routing hint: which collection a piece of text most likely belongs to.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Collection;
}
