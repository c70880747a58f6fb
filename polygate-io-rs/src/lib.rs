//! Hardware plumbing around the [`polygate`] state machine, using Embassy.
//!
//! The pure parts (screen layout, press classification, CV edge
//! detection, gate timing, document framing) build and test on the host.
//! The async loops that tie them to real peripherals sit behind the
//! `task` feature; each is a generic `async fn` that the firmware wraps in
//! a concrete `#[embassy_executor::task]`.
//!
//! # Quick Start
//!
//! ```ignore
//! use polygate_io::{display_update_task, DisplayConfig, OledDriver, Shared};
//!
//! static SHARED: StaticCell<Shared> = StaticCell::new();
//! let shared = SHARED.init(Shared::new());
//! spawner.spawn(oled_task(OledDriver::new(i2c_oled, 0x3C), shared).unwrap());
//!
//! #[embassy_executor::task]
//! async fn oled_task(driver: OledDriver<SharedI2c>, shared: &'static Shared) {
//!     display_update_task(driver, shared, DisplayConfig::default()).await;
//! }
//! ```
//!
//! # Crate Features
//!
//! - **`defmt`**: structured logging via [`defmt`]; enabled by the firmware.
//! - **`task`**: the Embassy task loops and [`Shared`].

#![no_std]

pub mod button;
pub mod cv;
pub mod display;
pub mod error;
pub mod gate;
pub mod oled;
pub mod sensor;
pub mod store;

#[cfg(feature = "task")]
pub mod clock_task;
#[cfg(feature = "task")]
pub mod display_task;
#[cfg(feature = "task")]
pub mod input_task;
#[cfg(feature = "task")]
pub mod persist_task;
#[cfg(feature = "task")]
pub mod shared;

// ── Re-exports for convenience ───────────────────────────────────────────

pub use button::{ButtonRole, Press, PressTracker};
pub use display::{render_display, DisplayChanges, DisplayConfig, DisplayFrame};
pub use error::{IoError, OledError};
pub use oled::OledDriver;
pub use sensor::{CvSource, TouchSensor};
pub use store::{decode_document, encode_document, DocumentStore, DOCUMENT_CAPACITY};

#[cfg(feature = "task")]
pub use clock_task::clock_task;
#[cfg(feature = "task")]
pub use display_task::display_update_task;
#[cfg(feature = "task")]
pub use input_task::{button_task, cv_task, dispatch_task, touch_task};
#[cfg(feature = "task")]
pub use persist_task::persist_task;
#[cfg(feature = "task")]
pub use shared::Shared;
