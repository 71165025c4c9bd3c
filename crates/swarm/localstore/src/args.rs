//! Local store CLI arguments.

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_CAPACITY, DEFAULT_GC_BATCH_SIZE};

/// Configuration consumed when opening a local store.
pub trait LocalStoreConfig {
    /// Whether to use the composite retrieval layout.
    fn use_retrieval_composite_index(&self) -> bool;

    /// Number of counted chunks garbage collection shrinks the store to.
    fn capacity(&self) -> u64;

    /// Gc entries read per collection pass.
    fn gc_batch_size(&self) -> usize;
}

/// Local store configuration arguments.
#[derive(Debug, Args, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Local Store")]
#[serde(default)]
pub struct LocalStoreArgs {
    /// Keep chunk payload and timestamps in a single retrieval record.
    ///
    /// Fixed when the store is created.
    #[arg(long = "localstore.retrieval-composite-index")]
    pub retrieval_composite_index: bool,

    /// Capacity in number of chunks; garbage collection evicts down to it.
    #[arg(long = "localstore.capacity", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: u64,

    /// Number of gc entries read per garbage collection pass.
    #[arg(long = "localstore.gc-batch-size", default_value_t = DEFAULT_GC_BATCH_SIZE)]
    pub gc_batch_size: usize,
}

impl Default for LocalStoreArgs {
    fn default() -> Self {
        Self {
            retrieval_composite_index: false,
            capacity: DEFAULT_CAPACITY,
            gc_batch_size: DEFAULT_GC_BATCH_SIZE,
        }
    }
}

impl LocalStoreConfig for LocalStoreArgs {
    fn use_retrieval_composite_index(&self) -> bool {
        self.retrieval_composite_index
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn gc_batch_size(&self) -> usize {
        self.gc_batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    /// A helper type to parse Args more easily
    #[derive(Parser)]
    struct CommandParser<T: Args> {
        #[command(flatten)]
        args: T,
    }

    #[test]
    fn test_parse_default_args() {
        let args = CommandParser::<LocalStoreArgs>::parse_from(["localstore"]).args;
        assert_eq!(args, LocalStoreArgs::default());
    }

    #[test]
    fn test_parse_args() {
        let args = CommandParser::<LocalStoreArgs>::parse_from([
            "localstore",
            "--localstore.retrieval-composite-index",
            "--localstore.capacity",
            "100",
            "--localstore.gc-batch-size",
            "8",
        ])
        .args;

        assert!(args.use_retrieval_composite_index());
        assert_eq!(args.capacity(), 100);
        assert_eq!(args.gc_batch_size(), 8);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let args: LocalStoreArgs = toml::from_str("capacity = 42").unwrap();
        assert_eq!(args.capacity, 42);
        assert!(!args.retrieval_composite_index);
        assert_eq!(args.gc_batch_size, DEFAULT_GC_BATCH_SIZE);

        let encoded = toml::to_string(&args).unwrap();
        assert_eq!(toml::from_str::<LocalStoreArgs>(&encoded).unwrap(), args);
    }
}
