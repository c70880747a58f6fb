//! State shared between the Embassy tasks.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use polygate::{ConfigStateMachine, Event, PersistedDocument};

/// Depth of the input event queue.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// The state machine plus the queues around it.
///
/// The machine sits behind a critical-section mutex so the clock path can
/// reach it without awaiting. Every lock is a short synchronous call; no
/// I2C, ADC or flash work happens while it is held.
pub struct Shared {
    machine: Mutex<CriticalSectionRawMutex, RefCell<ConfigStateMachine>>,
    /// Latest document waiting to be written; older ones are replaced.
    pending: Mutex<CriticalSectionRawMutex, RefCell<Option<PersistedDocument>>>,
    persist: Signal<CriticalSectionRawMutex, ()>,
    pub events: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_DEPTH>,
}

impl Default for Shared {
    fn default() -> Self {
        Self::new()
    }
}

impl Shared {
    pub fn new() -> Self {
        Self {
            machine: Mutex::new(RefCell::new(ConfigStateMachine::new())),
            pending: Mutex::new(RefCell::new(None)),
            persist: Signal::new(),
            events: Channel::new(),
        }
    }

    /// Run `f` with exclusive access to the machine.
    ///
    /// If `f` left `needs_persist` raised, the resulting document is
    /// staged for the persist task.
    pub fn with_machine<R>(&self, f: impl FnOnce(&mut ConfigStateMachine) -> R) -> R {
        let (result, staged) = self.machine.lock(|cell| {
            let mut machine = cell.borrow_mut();
            let result = f(&mut machine);
            let staged = machine.take_persist().then(|| machine.persisted_document());
            (result, staged)
        });
        if let Some(doc) = staged {
            self.pending.lock(|cell| *cell.borrow_mut() = Some(doc));
            self.persist.signal(());
        }
        result
    }

    /// Take the staged document, if any.
    pub fn take_document(&self) -> Option<PersistedDocument> {
        self.pending.lock(|cell| cell.borrow_mut().take())
    }

    /// Wait until a document is staged and take it.
    pub async fn next_document(&self) -> PersistedDocument {
        loop {
            self.persist.wait().await;
            if let Some(doc) = self.take_document() {
                return doc;
            }
        }
    }
}
