use serde::{Deserialize, Serialize};

/// Recognised pipeline options (spec.md §6 "Configuration").
///
/// Mirrors the teacher's pattern of passing a small, serde-friendly
/// config struct through the container (`container.rs`) rather than
/// reading environment variables deep inside a use case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-chunk source byte cap (default 20 MiB).
    pub chunk_byte_budget: u64,
    /// LRU size for retained syntax trees.
    pub ast_cache_capacity: usize,
    /// Parser pool size; `None` means `min(8, max(1, cpus - 1))`.
    pub worker_count: Option<usize>,
    /// Files per worker sub-batch message.
    pub sub_batch_size: usize,
    /// Per-sub-batch deadline.
    pub sub_batch_timeout_ms: u64,
    /// Files above this size are skipped (default 512 KiB).
    pub max_file_size_bytes: u64,
    pub community_max_iterations: u32,
    pub community_modularity_epsilon: f64,
    pub process_max_depth: u32,
    pub process_min_steps: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_byte_budget: 20 * 1024 * 1024,
            ast_cache_capacity: 50,
            worker_count: None,
            sub_batch_size: 1500,
            sub_batch_timeout_ms: 30_000,
            max_file_size_bytes: 512 * 1024,
            community_max_iterations: 10,
            community_modularity_epsilon: 1e-4,
            process_max_depth: 20,
            process_min_steps: 3,
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Resolves the effective worker pool size (spec.md §4.4 "Concurrency
    /// invariant"): `min(8, max(1, cpus - 1))` unless overridden.
    pub fn effective_worker_count(&self) -> usize {
        self.worker_count.unwrap_or_else(|| {
            let cpus = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            (cpus.saturating_sub(1)).clamp(1, 8)
        })
    }

    /// `maxProcesses = clamp(20, symbolCount / 10, 300)` (spec.md §4.9 step 4).
    pub fn max_processes(&self, symbol_count: usize) -> usize {
        let candidate = symbol_count / 10;
        candidate.clamp(20, 300)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_spec() {
        let config = PipelineConfig::default();
        assert_eq!(config.chunk_byte_budget, 20 * 1024 * 1024);
        assert_eq!(config.ast_cache_capacity, 50);
        assert_eq!(config.sub_batch_size, 1500);
        assert_eq!(config.sub_batch_timeout_ms, 30_000);
        assert_eq!(config.max_file_size_bytes, 512 * 1024);
        assert_eq!(config.community_max_iterations, 10);
        assert_eq!(config.process_max_depth, 20);
        assert_eq!(config.process_min_steps, 3);
    }

    #[test]
    fn effective_worker_count_is_bounded_between_one_and_eight() {
        let config = PipelineConfig {
            worker_count: Some(100),
            ..PipelineConfig::default()
        };
        assert_eq!(config.effective_worker_count(), 100);

        let auto = PipelineConfig::default();
        let n = auto.effective_worker_count();
        assert!(n >= 1 && n <= 8);
    }

    #[test]
    fn max_processes_is_clamped() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_processes(0), 20);
        assert_eq!(config.max_processes(100_000), 300);
        assert_eq!(config.max_processes(1_000), 100);
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let config = PipelineConfig::from_json(r#"{"chunk_byte_budget": 1024}"#).unwrap();
        assert_eq!(config.chunk_byte_budget, 1024);
        assert_eq!(config.ast_cache_capacity, 50);
    }
}
