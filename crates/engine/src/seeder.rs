//! Startup seeding of well-known counters

use tracing::{debug, error, info};

use crate::counter::CounterStore;

/// Create each named counter with value 0 if it does not exist yet
///
/// Counters are seeded under their name as both partition key and id.
/// Failures are logged and skipped; startup carries on without them.
/// Returns the number of counters this call created.
pub async fn seed_counters<S: AsRef<str>>(counters: &CounterStore, names: &[S]) -> usize {
    let mut created = 0;
    for name in names {
        let name = name.as_ref();
        match counters.seed(name, name).await {
            Ok(true) => {
                info!(target: "countfeed::seed", name, "Seeded counter with value 0");
                created += 1;
            }
            Ok(false) => {
                debug!(target: "countfeed::seed", name, "Counter already exists");
            }
            Err(e) => {
                error!(target: "countfeed::seed", name, error = %e, "Failed to seed counter");
            }
        }
    }
    created
}
