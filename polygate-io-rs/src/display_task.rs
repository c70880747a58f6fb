//! Periodic OLED refresh.

use embassy_time::{Duration, Timer};
use embedded_hal_async::i2c::I2c;

use crate::display::{DisplayChanges, DisplayConfig, DisplayFrame};
use crate::oled::OledDriver;
use crate::shared::Shared;

/// Display update loop.
///
/// A plain `async fn`; Embassy tasks cannot be generic, so wrap it in a
/// concrete `#[embassy_executor::task]`:
///
/// ```ignore
/// #[embassy_executor::task]
/// async fn oled_task(driver: OledDriver<SharedI2c>, shared: &'static Shared) {
///     display_update_task(driver, shared, DisplayConfig::default()).await;
/// }
/// ```
///
/// # Control flow
///
/// 1. Initialise the panel; on failure log and return.
/// 2. Every `config.update_period_ms()`:
///    - **Step 1**: lock the machine, take `needs_redisplay` and, if it was
///      set, copy a [`DisplaySnapshot`](polygate::DisplaySnapshot).
///    - **Step 2**: build a [`DisplayFrame`]; skip if identical to the last.
///    - **Step 3**: render and flush without holding the lock.
///    - **Step 4**: on a failed flush, raise `needs_redisplay` again so the
///      next cycle retries.
#[allow(clippy::needless_pass_by_value)]
pub async fn display_update_task<I2C>(mut driver: OledDriver<I2C>, shared: &'static Shared, config: DisplayConfig)
where
    I2C: I2c,
{
    if let Err(_e) = driver.init().await {
        #[cfg(feature = "defmt")]
        defmt::error!("OLED init failed: {}", _e);
        return;
    }

    #[cfg(feature = "defmt")]
    defmt::info!("OLED initialised");

    shared.with_machine(|m| m.request_redisplay());
    let period = Duration::from_millis(config.update_period_ms());
    let mut last_frame: Option<DisplayFrame> = None;

    loop {
        Timer::after(period).await;

        // ── Step 1: snapshot under the lock ──────────────────────────
        let Some(snapshot) = shared.with_machine(|m| m.take_redisplay().then(|| m.display_snapshot())) else {
            continue;
        };

        // ── Step 2: skip identical frames ────────────────────────────
        let frame = DisplayFrame::from_snapshot(&snapshot);
        if let Some(last) = &last_frame {
            if !DisplayChanges::detect(last, &frame).any_changed() {
                continue;
            }
        }

        // ── Step 3: render and flush, lock released ──────────────────
        if let Err(_e) = driver.show(&frame, &config).await {
            #[cfg(feature = "defmt")]
            defmt::error!("OLED flush failed: {}", _e);

            // ── Step 4: retry next cycle ─────────────────────────────
            shared.with_machine(|m| m.request_redisplay());
            continue;
        }

        last_frame = Some(frame);
    }
}
