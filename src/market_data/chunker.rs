// =============================================================================
// Range Chunker — split a time window into capped upstream calls
// =============================================================================
//
// total_bars = (end - start) / bar_ms
// Each chunk takes min(remaining, max_bars_per_call) bars and ends at
// chunk_start + bars * bar_ms. The next chunk starts one bar after that end,
// so the boundary bar is never requested twice.
// =============================================================================

use serde::Serialize;

/// One upstream request window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub start_ms: i64,
    pub end_ms: i64,
    pub bar_count: i64,
}

/// Split `[start_ms, end_ms)` into chunks of at most `max_bars_per_call` bars.
///
/// Returns an empty vec when the window holds no whole bar, when
/// `end_ms <= start_ms`, or when either size argument is not positive.
pub fn chunk(start_ms: i64, end_ms: i64, bar_ms: i64, max_bars_per_call: i64) -> Vec<Chunk> {
    if bar_ms <= 0 || max_bars_per_call <= 0 || end_ms <= start_ms {
        return Vec::new();
    }

    let mut remaining = (end_ms - start_ms) / bar_ms;
    let mut chunks = Vec::with_capacity((remaining / max_bars_per_call + 1) as usize);
    let mut cursor = start_ms;

    while remaining > 0 {
        let bars = remaining.min(max_bars_per_call);
        let chunk_end = cursor + bars * bar_ms;
        chunks.push(Chunk {
            start_ms: cursor,
            end_ms: chunk_end,
            bar_count: bars,
        });
        cursor = chunk_end + bar_ms;
        remaining -= bars;
    }

    chunks
}
