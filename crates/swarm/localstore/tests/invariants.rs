//! Index invariants under arbitrary sequences of mode calls.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use vertex_storage::MemoryStore;
use vertex_swarm_localstore::{
    Access, FixedClock, LayoutKind, LocalStore, LocalStoreResult, Mode, Options, Removal,
    Request, Synced, Syncing, Upload,
};
use vertex_swarm_primitives::{Chunk, ChunkAddress};

fn chunk(seed: u8) -> Chunk {
    let mut address = [0u8; 32];
    address[0] = seed.wrapping_mul(37);
    address[31] = seed;
    Chunk::new(ChunkAddress::new(address), vec![seed; 64])
}

fn call(db: &LocalStore<MemoryStore>, mode: Mode, chunk: &Chunk) -> LocalStoreResult<()> {
    match mode {
        Mode::Syncing => db.accessor::<Syncing>().put(chunk),
        Mode::Upload => db.accessor::<Upload>().put(chunk),
        Mode::Request => db.accessor::<Request>().put(chunk),
        Mode::Synced => db.accessor::<Synced>().put(chunk),
        Mode::Access => db.accessor::<Access>().get(chunk.address()).map(drop),
        Mode::Removal => db.accessor::<Removal>().put(chunk),
    }
}

fn check_invariants(db: &LocalStore<MemoryStore>) -> Result<(), TestCaseError> {
    let indexes = db.indexes();

    // size counts exactly the chunks with a pull entry
    prop_assert_eq!(db.size().unwrap(), indexes.pull.count().unwrap());

    // every gc entry has a retrieval record with the same access time, once
    let mut seen = HashSet::new();
    for item in indexes.gc.first(usize::MAX).unwrap() {
        prop_assert!(seen.insert(item.address), "duplicate gc entry for {}", item.address);
        let stored = match db.layout() {
            LayoutKind::Composite => indexes.retrieval_composite.get(&item),
            LayoutKind::Split => indexes.retrieval_access.get(&item),
        };
        prop_assert_eq!(stored.unwrap().access_timestamp, item.access_timestamp);
    }

    // pull and push entries point at stored chunks
    for index_items in [indexes.pull.first(usize::MAX).unwrap(), indexes.push.first(usize::MAX).unwrap()] {
        for item in index_items {
            prop_assert!(db.has(&item.address).unwrap());
        }
    }
    Ok(())
}

fn arb_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![
        Just(Mode::Syncing),
        Just(Mode::Upload),
        Just(Mode::Request),
        Just(Mode::Synced),
        Just(Mode::Access),
        Just(Mode::Removal),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn mode_sequences_keep_indexes_consistent(
        composite in any::<bool>(),
        calls in prop::collection::vec((arb_mode(), 0u8..6, 0i64..3), 1..60),
    ) {
        let clock = Arc::new(FixedClock::new(1));
        let options = Options { use_retrieval_composite_index: composite, ..Default::default() };
        let db = LocalStore::open_with_clock(MemoryStore::new(), ChunkAddress::ZERO, options, clock.clone())
            .unwrap();

        for (mode, seed, tick) in calls {
            clock.advance(tick);
            match call(&db, mode, &chunk(seed)) {
                Ok(()) => {}
                Err(err) => prop_assert!(err.is_not_found(), "{mode}: {err}"),
            }
            check_invariants(&db)?;
        }

        let report = db.collect_garbage(0)?;
        check_invariants(&db)?;
        // either the target was reached or nothing is left to evict
        prop_assert!(report.size == 0 || db.indexes().gc.is_empty().unwrap());
    }
}
