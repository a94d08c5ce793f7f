// ── Canonical notification store ──
//
// The synchronizer owns the loaded list, the page window, and the filter.
// Every edit goes through one merge function and republishes a snapshot.

mod list;
mod synchronizer;

pub use synchronizer::{LoadOutcome, SyncState, Synchronizer};
