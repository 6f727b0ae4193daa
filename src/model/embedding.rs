use rig::embeddings::Embedding;

/// Helper functions for converting between embedding representations.
///
/// Vectors are stored as little-endian `f32` blobs.
pub trait EmbeddingConversion {
    fn to_vec(&self) -> Vec<f32>;
    fn to_binary(&self) -> Vec<u8>;
}

impl EmbeddingConversion for Embedding {
    fn to_vec(&self) -> Vec<f32> {
        self.vec.iter().map(|f| *f as f32).collect()
    }

    fn to_binary(&self) -> Vec<u8> {
        vector_to_blob(&self.to_vec())
    }
}

/// Encode a vector as a little-endian `f32` blob
pub fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Decode a blob written by [`vector_to_blob`]. Trailing bytes that do not form
/// a whole `f32` are ignored.
pub fn blob_to_vector(binary: &[u8]) -> Vec<f32> {
    binary
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity of two vectors.
///
/// Zero when the lengths differ, either vector is empty, or either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}
