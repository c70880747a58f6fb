//! Clock source and gate outputs.

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::digital::Wait;
use tinyrand::{Seeded, Wyrand};

use polygate::config::{ClockSource, CHANNEL_COUNT};

use crate::gate::GateScheduler;
use crate::shared::Shared;

/// How often an idle external clock wait looks at the clock settings.
const SOURCE_RECHECK_MS: u64 = 50;

/// Drive [`clock_tick`](polygate::ConfigStateMachine::clock_tick) from
/// the internal timer or the clock jack, and the four gate outputs from
/// its results.
///
/// The source and period are re-read from the machine every cycle, so
/// menu and tap tempo edits apply from the next tick. `seed` feeds the
/// probability and random gate length draws.
pub async fn clock_task<C, G>(mut clock_in: C, mut gates: [G; CHANNEL_COUNT], shared: &'static Shared, seed: u64) -> !
where
    C: Wait,
    G: OutputPin,
{
    let mut rand = Wyrand::seed(seed);
    let mut scheduler = GateScheduler::new();
    let mut next_tick = Instant::now();

    loop {
        let clock = shared.with_machine(|m| *m.clock());
        let period = Duration::from_millis(u64::from(clock.period_ms()));
        let gate_off = scheduler.next_deadline().map_or(Instant::MAX, Instant::from_millis);

        let tick = match clock.source {
            ClockSource::Internal => {
                // resync after a stall or a switch from the external clock
                if next_tick + period < Instant::now() {
                    next_tick = Instant::now();
                }
                match select(Timer::at(next_tick), Timer::at(gate_off)).await {
                    Either::First(()) => {
                        next_tick += period;
                        true
                    }
                    Either::Second(()) => false,
                }
            }
            ClockSource::External => {
                let recheck = Instant::now() + Duration::from_millis(SOURCE_RECHECK_MS);
                match select(clock_in.wait_for_rising_edge(), Timer::at(gate_off.min(recheck))).await {
                    Either::First(Ok(())) => true,
                    Either::First(Err(_)) => {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("clock input failed");
                        false
                    }
                    Either::Second(()) => false,
                }
            }
        };

        if tick {
            let now = Instant::now().as_millis();
            let fired = shared.with_machine(|m| m.clock_tick(&mut rand));
            for (channel, length) in fired.iter().enumerate() {
                if let Some(length) = *length {
                    let _ = gates[channel].set_high();
                    scheduler.fire(channel, now, length);
                }
            }
        }

        let closed = scheduler.expire(Instant::now().as_millis());
        for (gate, close) in gates.iter_mut().zip(closed) {
            if close {
                let _ = gate.set_low();
            }
        }
    }
}
