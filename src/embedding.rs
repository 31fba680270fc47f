use crate::error::Result;

/// Turns text into fixed-length vectors in a shared semantic space.
///
/// Ingestion and search must use the same embedder: scores are only
/// meaningful between vectors from the same model. Implementations must be
/// deterministic and always return `dimension()` values.
pub trait Embedder {
    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&mut self) -> Result<usize>;

    /// Embed a single text.
    fn embed(&mut self, text: &str) -> Result<Vec<f32>>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn dimension(&mut self) -> Result<usize> {
        (**self).dimension()
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

/// Bag-of-words embedder for tests: each distinct lowercase word gets its
/// own slot (modulo `dimension`) the first time it is seen, so texts
/// sharing words score higher.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct KeywordEmbedder {
    pub dimension: usize,
    pub calls: usize,
    vocabulary: std::collections::HashMap<String, usize>,
}

#[cfg(test)]
impl KeywordEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: 0,
            vocabulary: std::collections::HashMap::new(),
        }
    }
}

#[cfg(test)]
impl Embedder for KeywordEmbedder {
    fn model_id(&self) -> &str {
        "test/keywords"
    }

    fn dimension(&mut self) -> Result<usize> {
        Ok(self.dimension)
    }

    fn embed(&mut self, text: &str) -> Result<Vec<f32>> {
        self.calls += 1;
        let mut vector = vec![0.0; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let next = self.vocabulary.len() % self.dimension;
            let slot = *self.vocabulary.entry(word.to_lowercase()).or_insert(next);
            vector[slot] += 1.0;
        }
        Ok(vector)
    }
}
