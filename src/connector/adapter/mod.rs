mod ast_cache;
mod fs_scanner;
mod jsonl_graph_sink;
mod treesitter_extractor;
mod worker_pool;

pub use ast_cache::*;
pub use fs_scanner::*;
pub use jsonl_graph_sink::*;
pub use treesitter_extractor::*;
pub use worker_pool::*;
