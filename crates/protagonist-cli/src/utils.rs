use std::ops::RangeInclusive;
use std::result;
use std::thread;

const WORKER_RANGE: RangeInclusive<usize> = 1..=256;

pub fn workers_in_range(s: &str) -> result::Result<usize, String> {
    let workers: usize = s
        .parse()
        .map_err(|_| format!("`{s}` isn't a number of workers"))?;
    if WORKER_RANGE.contains(&workers) {
        Ok(workers)
    } else {
        Err(format!(
            "workers not in range {}-{}",
            WORKER_RANGE.start(),
            WORKER_RANGE.end()
        ))
    }
}

/// One worker per available core, falling back to a single worker.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get().min(*WORKER_RANGE.end()))
        .unwrap_or(1)
}
