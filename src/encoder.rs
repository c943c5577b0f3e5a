//! Turns serialized bytes into an ordered frame sequence and back
//! (spec.md §4.3), with sequential and order-preserving parallel execution
//! modes.

use crate::config::EncodingConfiguration;
use crate::error::{Reason, Result};
use crate::symbol::{self, Raster};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;

/// `[data[0:seg], data[seg:2*seg], ...]`. The last slice may be short but is
/// never empty unless `data` itself is empty, per spec.md §4.3 step 2.
pub fn chunk_bounds(data_len: usize, seg: usize) -> Vec<(usize, usize)> {
    if data_len == 0 || seg == 0 {
        return Vec::new();
    }

    (0..data_len).step_by(seg).map(|start| (start, (start + seg).min(data_len))).collect()
}

/// The natural dimensions of a symbol carrying a full-size chunk at this
/// configuration's effective segment size. Every frame in a video produced
/// from this configuration -- header included -- is padded up to this size,
/// so frame dimensions are a pure function of the configuration, never of
/// the payload itself (spec.md §3's Frame invariant).
pub fn reference_dimensions(config: &EncodingConfiguration) -> Result<(u32, u32)> {
    let seg = config.effective_segment_size();
    let probe = vec![0_u8; seg];
    let raster = symbol::render(&probe, config.error_correction, config.quiet_zone_modules, config.module_pixels, None)?;
    Ok(raster.dimensions())
}

fn render_chunk(chunk: &[u8], chunk_index: usize, config: &EncodingConfiguration, target: (u32, u32)) -> Result<Raster> {
    let max = config.error_correction.max_bytes();
    if chunk.len() > max {
        return Err(Reason::CapacityExceeded { chunk_index, len: chunk.len(), max });
    }

    symbol::render(chunk, config.error_correction, config.quiet_zone_modules, config.module_pixels, Some(target))
}

/// Chunks `data` per spec.md §4.3 step 1-2, then renders each chunk into a
/// frame in index order, sized to `config`'s own reference dimensions.
/// Empty `data` yields zero frames.
pub fn encode(data: &[u8], config: &EncodingConfiguration) -> Result<Vec<Raster>> {
    let target = reference_dimensions(config)?;
    encode_with_target(data, config, target)
}

/// Same as `encode`, but sized to a caller-supplied `target` instead of one
/// computed from `config` alone. The pipeline orchestrator uses this to pin
/// every payload frame to a target that also bounds the header frame's
/// natural size, since the header blob's own QR version is independent of
/// `effective_segment_size` and can otherwise exceed it (see
/// `pipeline::encode_to_frames`).
pub fn encode_with_target(data: &[u8], config: &EncodingConfiguration, target: (u32, u32)) -> Result<Vec<Raster>> {
    let seg = config.effective_segment_size();
    let bounds = chunk_bounds(data.len(), seg);
    if bounds.is_empty() {
        return Ok(Vec::new());
    }

    if config.enable_multiprocessing {
        let chunks: Vec<Vec<u8>> = bounds.iter().map(|&(start, end)| data[start..end].to_vec()).collect();
        let workers = config.resolved_worker_count();
        debug!("qrvid: rendering {} chunk(s) on {workers} worker(s)", chunks.len());
        let config = config.clone();

        ordered_parallel_map(chunks, workers, move |index, chunk| {
            render_chunk(&chunk, index, &config, target)
        })
    } else {
        bounds
            .iter()
            .enumerate()
            .map(|(index, &(start, end))| render_chunk(&data[start..end], index, config, target))
            .collect()
    }
}

/// Detects and concatenates every payload frame in order, per spec.md §4.3
/// step 2-3 of Decode. `frame_index_offset` is added to each frame's position
/// when reporting `FrameCorrupt`, since payload frames are offset by the
/// header frame on the wire.
pub fn decode(frames: &[Raster], frame_index_offset: usize, config: &EncodingConfiguration) -> Result<Vec<u8>> {
    if frames.is_empty() {
        return Ok(Vec::new());
    }

    let segments = if config.enable_multiprocessing {
        let workers = config.resolved_worker_count();
        debug!("qrvid: detecting {} frame(s) on {workers} worker(s)", frames.len());
        let owned: Vec<Raster> = frames.to_vec();

        ordered_parallel_map(owned, workers, move |index, raster| {
            symbol::detect(&raster).map_err(|_| Reason::FrameCorrupt(frame_index_offset + index))
        })?
    } else {
        frames
            .iter()
            .enumerate()
            .map(|(index, raster)| symbol::detect(raster).map_err(|_| Reason::FrameCorrupt(frame_index_offset + index)))
            .collect::<Result<Vec<_>>>()?
    };

    Ok(segments.into_iter().flatten().collect())
}

/// An order-preserving parallel map: `work` runs on a bounded thread pool,
/// workers may complete in any order, but the returned vector is in input
/// order -- a direct generalization of the reorder-buffer-plus-bounded-queue
/// pattern used for parallel chunk compression/decompression. Backpressure
/// caps in-flight tasks at `2 * worker_count` (spec.md §5).
///
/// The first error observed stops new dispatch; already-dispatched work is
/// drained and dropped, then the error is returned -- no partial results are
/// ever produced, matching spec.md §4.3's "no retries, no partial payload".
fn ordered_parallel_map<T, R, F>(items: Vec<T>, worker_count: usize, work: F) -> Result<Vec<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Result<R> + Send + Sync + 'static,
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let worker_count = worker_count.max(1).min(total);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .map_err(|error| Reason::invariant(format!("failed to start worker pool: {error}")))?;

    let max_in_flight = worker_count * 2;
    let work = Arc::new(work);
    let (sender, receiver) = mpsc::channel::<(usize, Result<R>)>();

    let mut pending_items = items.into_iter().enumerate();
    let mut in_flight = 0_usize;
    let mut reorder_buffer: BTreeMap<usize, R> = BTreeMap::new();
    let mut output = Vec::with_capacity(total);
    let mut fatal: Option<Reason> = None;

    loop {
        while fatal.is_none() && in_flight < max_in_flight {
            match pending_items.next() {
                Some((index, item)) => {
                    let sender = sender.clone();
                    let work = Arc::clone(&work);
                    pool.spawn(move || {
                        let result = work(index, item);
                        let _ = sender.send((index, result));
                    });
                    in_flight += 1;
                }
                None => break,
            }
        }

        if in_flight == 0 {
            break;
        }

        let (index, result) = receiver.recv().expect("worker pool channel closed unexpectedly");
        in_flight -= 1;

        match result {
            Ok(value) => {
                reorder_buffer.insert(index, value);
            }
            Err(reason) => {
                warn!("qrvid: worker pool task {index} failed: {reason}");
                fatal.get_or_insert(reason);
            }
        }

        while let Some(value) = reorder_buffer.remove(&output.len()) {
            output.push(value);
        }
    }

    match fatal {
        Some(reason) => Err(reason),
        None => Ok(output),
    }
}
