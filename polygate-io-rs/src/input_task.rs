//! Input loops feeding the state machine.
//!
//! Buttons and the touch rings produce [`Event`](polygate::Event)s that
//! are queued and applied one at a time by [`dispatch_task`]. CV readings
//! bypass the queue and go straight to
//! [`apply_cv`](polygate::ConfigStateMachine::apply_cv).

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::InputPin;
use embedded_hal_async::digital::Wait;

use polygate::config::CV_CHANNEL_COUNT;
use polygate::gesture::{Calibrator, GestureDecoder};

use crate::button::{ButtonRole, Debounce, PressTracker, LONG_PRESS_MS};
use crate::cv::CvInput;
use crate::sensor::{CvSource, TouchFilter, TouchSensor};
use crate::shared::Shared;

fn now_ms() -> u64 {
    Instant::now().as_millis()
}

// ── Dispatch ─────────────────────────────────────────────────────────────

/// Apply queued events in arrival order.
pub async fn dispatch_task(shared: &'static Shared) -> ! {
    loop {
        let event = shared.events.receive().await;
        shared.with_machine(|m| m.on_event(event));
    }
}

// ── Buttons ──────────────────────────────────────────────────────────────

/// One debounced, active-low button.
///
/// Long presses are sent as soon as the hold reaches
/// [`LONG_PRESS_MS`], not on release.
pub async fn button_task<P>(pin: P, role: ButtonRole, shared: &'static Shared)
where
    P: Wait + InputPin,
{
    let mut button = Debounce::new(pin);
    let mut tracker = PressTracker::default();

    loop {
        if button.wait_for_press().await.is_err() {
            #[cfg(feature = "defmt")]
            defmt::error!("button {} input failed", role);
            return;
        }
        let pressed_at = now_ms();
        tracker.press(pressed_at);

        let long_at = Instant::from_millis(pressed_at + LONG_PRESS_MS);
        let press = match select(button.wait_for_release(), Timer::at(long_at)).await {
            Either::First(_) => tracker.release(now_ms()),
            Either::Second(()) => tracker.poll(now_ms()),
        };
        if let Some(press) = press {
            shared.events.send(role.event(press, pressed_at)).await;
        }

        // still held after a long press
        if tracker.pressed_at().is_some() {
            let _ = button.wait_for_release().await;
            tracker.release(now_ms());
        }
    }
}

// ── Touch rings ──────────────────────────────────────────────────────────

/// Calibrate the ring sensor, then poll it every `poll_ms`.
///
/// A sensor that is not detected disables the rings for the session; a
/// failed read skips that cycle.
pub async fn touch_task<S>(mut sensor: S, shared: &'static Shared, poll_ms: u64)
where
    S: TouchSensor,
{
    if let Err(_e) = sensor.detect().await {
        #[cfg(feature = "defmt")]
        defmt::warn!("touch sensor unavailable, rings disabled: {}", _e);
        return;
    }

    let period = Duration::from_millis(poll_ms);
    let mut calibrator = Calibrator::new();
    let baseline = loop {
        Timer::after(period).await;
        match sensor.read_raw().await {
            Ok(raw) => {
                if let Some(baseline) = calibrator.push(&raw) {
                    break baseline;
                }
            }
            Err(e) if e.is_fatal() => return,
            Err(_) => {}
        }
    };

    let mut decoder = GestureDecoder::new(baseline);
    let mut filter = TouchFilter::default();
    loop {
        Timer::after(period).await;
        let raw = match sensor.read_raw().await {
            Ok(raw) => raw,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("touch read failed: {}", e);
                if e.is_fatal() {
                    return;
                }
                continue;
            }
        };

        let sensitivity = shared.with_machine(|m| m.interface().sensitivity.index());
        decoder.set_sensitivity(sensitivity);
        if let Some(event) = filter.filter(decoder.update(&raw, now_ms())) {
            shared.events.send(event).await;
        }
    }
}

// ── CV inputs ────────────────────────────────────────────────────────────

/// Sample the CV jacks every `poll_ms` and apply changed levels and
/// rising edges.
pub async fn cv_task<S>(mut source: S, shared: &'static Shared, poll_ms: u64)
where
    S: CvSource,
{
    let period = Duration::from_millis(poll_ms);
    let mut inputs = [CvInput::default(); CV_CHANNEL_COUNT];

    loop {
        Timer::after(period).await;
        let raw = match source.read_raw().await {
            Ok(raw) => raw,
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("CV read failed: {}", _e);
                continue;
            }
        };

        shared.with_machine(|m| {
            for (i, (input, &reading)) in inputs.iter_mut().zip(raw.iter()).enumerate() {
                let Some(config) = m.cv_config(i) else {
                    continue;
                };
                if let Some((percent, edge)) = input.update(config.normalize(reading)) {
                    let _ = m.apply_cv(i, percent, edge);
                }
            }
        });
    }
}
