//! Loading and saving the configuration document.

use embassy_time::{Duration, Timer};

use polygate::{Event, PersistedDocument};

use crate::shared::Shared;
use crate::store::DocumentStore;

/// Quiet time after an edit before the document is written, so a burst
/// of encoder steps costs one flash write.
pub const PERSIST_SETTLE_MS: u64 = 1000;

/// Restore the stored document, leave `Init`, then write back every
/// staged document.
///
/// A missing, unreadable or incomplete document is replaced with the full
/// current one straight away.
pub async fn persist_task<S>(mut store: S, shared: &'static Shared) -> !
where
    S: DocumentStore,
{
    let stored = match store.load().await {
        Ok(doc) => doc,
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::error!("loading configuration failed: {}", _e);
            None
        }
    };

    let repair = shared.with_machine(|m| {
        let report = m.load_document(&stored.unwrap_or_default());
        m.on_event(Event::Init);
        report.is_partial().then(|| m.persisted_document())
    });

    if let Some(doc) = repair {
        save(&mut store, &doc).await;
    }

    loop {
        let mut doc = shared.next_document().await;
        Timer::after(Duration::from_millis(PERSIST_SETTLE_MS)).await;
        if let Some(newer) = shared.take_document() {
            doc = newer;
        }
        save(&mut store, &doc).await;
    }
}

async fn save<S: DocumentStore>(store: &mut S, doc: &PersistedDocument) {
    match store.save(doc).await {
        Ok(()) => {
            #[cfg(feature = "defmt")]
            defmt::debug!("configuration saved");
        }
        Err(_e) => {
            #[cfg(feature = "defmt")]
            defmt::error!("saving configuration failed: {}", _e);
        }
    }
}
