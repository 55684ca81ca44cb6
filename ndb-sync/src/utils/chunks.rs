//! Work partitioning for bounded-concurrency stages

/// Split `items` into at most `chunk_count` contiguous chunks
///
/// Chunk size is `ceil(len / chunk_count)`, so every chunk but the last is
/// full. Empty input yields no chunks, a zero count is treated as one, and a
/// count larger than the input yields one item per chunk.
pub fn partition_into_chunks<T: Clone>(items: &[T], chunk_count: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }

    let chunk_count = chunk_count.clamp(1, items.len());
    let chunk_size = items.len().div_ceil(chunk_count);

    items.chunks(chunk_size).map(<[T]>::to_vec).collect()
}
