//! polygate-hw-interface
//!
//! Four-channel euclidean gate generator firmware for the Raspberry Pi
//! Pico 2. Wires the `polygate` state machine to the panel:
//!
//! 1. Buttons, the encoder and the touch rings queue events; the dispatch
//!    task applies them to the shared state machine.
//! 2. The CV task samples the four jacks and applies level changes and
//!    rising edges directly.
//! 3. The clock task ticks every channel from the internal timer or the
//!    clock jack and drives the four gate outputs.
//! 4. The OLED task redraws when `needs_redisplay` is raised; the persist
//!    task writes the configuration to flash when `needs_persist` is.

#![no_std]
#![no_main]

mod cv_adc;
mod mpr121;
mod storage;

use defmt::*;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_executor::Spawner;
use embassy_rp::adc::{self, Adc, Channel};
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, PIO0};
use embassy_rp::pio::{self, Pio};
use embassy_rp::pio_programs::rotary_encoder::{Direction, PioEncoder, PioEncoderProgram};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use polygate::{Event, Motion};
use polygate_io::{
    button_task, clock_task, cv_task, dispatch_task, display_update_task, persist_task, touch_task,
    ButtonRole, DisplayConfig, OledDriver, Shared,
};

use cv_adc::CvAdc;
use mpr121::Mpr121;
use storage::{FlashStore, FLASH_SIZE};

// ---------------------------------------------------------------------------
// Boot block and interrupt binding
// ---------------------------------------------------------------------------

/// Tell the RP2350 Boot ROM about our application.
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = embassy_rp::block::ImageDef::secure_exe();

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
    ADC_IRQ_FIFO => adc::InterruptHandler;
    PIO0_IRQ_0 => pio::InterruptHandler<PIO0>;
});

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

const TOUCH_POLL_MS: u64 = 10;
const CV_POLL_MS: u64 = 5;

// ---------------------------------------------------------------------------
// Static storage
// ---------------------------------------------------------------------------

/// Shared I2C0 bus: the touch controller and the OLED each hold an
/// `I2cDevice` that locks it per transaction.
static I2C_BUS: StaticCell<Mutex<CriticalSectionRawMutex, I2c<'static, I2C0, i2c::Async>>> = StaticCell::new();

static SHARED: StaticCell<Shared> = StaticCell::new();

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

type SharedI2c = I2cDevice<'static, CriticalSectionRawMutex, I2c<'static, I2C0, i2c::Async>>;

type Encoder = PioEncoder<'static, PIO0, 0>;

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------
//
// Thin wrappers that monomorphise the generic `polygate_io` loops so they
// can be spawned as concrete Embassy tasks.

#[embassy_executor::task]
async fn oled_task(driver: OledDriver<SharedI2c>, shared: &'static Shared) {
    display_update_task(driver, shared, DisplayConfig::default()).await;
}

#[embassy_executor::task]
async fn rings_task(sensor: Mpr121<SharedI2c>, shared: &'static Shared) {
    touch_task(sensor, shared, TOUCH_POLL_MS).await;
}

#[embassy_executor::task]
async fn jacks_task(source: CvAdc, shared: &'static Shared) {
    cv_task(source, shared, CV_POLL_MS).await;
}

#[embassy_executor::task]
async fn gates_task(clock_in: Input<'static>, gates: [Output<'static>; 4], shared: &'static Shared, seed: u64) {
    clock_task(clock_in, gates, shared, seed).await;
}

#[embassy_executor::task]
async fn storage_task(store: FlashStore, shared: &'static Shared) {
    persist_task(store, shared).await;
}

#[embassy_executor::task]
async fn events_task(shared: &'static Shared) {
    dispatch_task(shared).await;
}

#[embassy_executor::task(pool_size = 6)]
async fn panel_button_task(pin: Input<'static>, role: ButtonRole, shared: &'static Shared) {
    button_task(pin, role, shared).await;
}

/// Each detent of the encoder is one increment or decrement.
#[embassy_executor::task]
async fn encoder_task(mut encoder: Encoder, shared: &'static Shared) {
    info!("Encoder task started");
    loop {
        let motion = match encoder.read().await {
            Direction::Clockwise => Motion::Increment,
            Direction::CounterClockwise => Motion::Decrement,
        };
        shared.events.send(Event::Encoder(motion)).await;
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("polygate starting");

    // ── Pin assignments ──────────────────────────────────────────────────
    // ENC_A, ENC_B   → GP2, GP3
    // MENU, TAP      → GP6, GP7    active-low, pull-up
    // SW1..SW4       → GP8..GP11   active-low, pull-up
    // CLK_IN         → GP12        rising edge
    // GATE1..GATE4   → GP13..GP16
    // I2C_SDA        → GP20
    // I2C_SCL        → GP21
    // CV1..CV4       → GP26..GP29  (ADC0..ADC3)

    let shared: &'static Shared = SHARED.init(Shared::new());

    // I2C0, shared between the touch controller and the OLED.
    let i2c = I2c::new_async(p.I2C0, p.PIN_21, p.PIN_20, Irqs, i2c::Config::default());
    let i2c_bus = I2C_BUS.init(Mutex::new(i2c));
    let oled = OledDriver::new(I2cDevice::new(i2c_bus), 0x3C);
    let touch = Mpr121::new(I2cDevice::new(i2c_bus), mpr121::DEFAULT_ADDRESS);

    // CV jacks. The ADC noise also seeds the probability draws.
    let adc = Adc::new(p.ADC, Irqs, adc::Config::default());
    let mut cv = CvAdc::new(
        adc,
        [
            Channel::new_pin(p.PIN_26, Pull::None),
            Channel::new_pin(p.PIN_27, Pull::None),
            Channel::new_pin(p.PIN_28, Pull::None),
            Channel::new_pin(p.PIN_29, Pull::None),
        ],
    );
    let seed = cv.noise_seed().await;

    let store = FlashStore::new(Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH));

    let Pio { mut common, sm0, .. } = Pio::new(p.PIO0, Irqs);
    let program = PioEncoderProgram::new(&mut common);
    let encoder = PioEncoder::new(&mut common, sm0, p.PIN_2, p.PIN_3, &program);

    let clock_in = Input::new(p.PIN_12, Pull::None);
    let gates = [
        Output::new(p.PIN_13, Level::Low),
        Output::new(p.PIN_14, Level::Low),
        Output::new(p.PIN_15, Level::Low),
        Output::new(p.PIN_16, Level::Low),
    ];

    let buttons = [
        (Input::new(p.PIN_6, Pull::Up), ButtonRole::Menu),
        (Input::new(p.PIN_7, Pull::Up), ButtonRole::Tap),
        (Input::new(p.PIN_8, Pull::Up), ButtonRole::Switch(0)),
        (Input::new(p.PIN_9, Pull::Up), ButtonRole::Switch(1)),
        (Input::new(p.PIN_10, Pull::Up), ButtonRole::Switch(2)),
        (Input::new(p.PIN_11, Pull::Up), ButtonRole::Switch(3)),
    ];

    // ── Spawn tasks ──────────────────────────────────────────────────────

    // The persist task loads the stored configuration and then sends the
    // machine out of Init; everything else can start right away.
    spawner.spawn(storage_task(store, shared).unwrap());
    spawner.spawn(events_task(shared).unwrap());
    spawner.spawn(oled_task(oled, shared).unwrap());
    spawner.spawn(rings_task(touch, shared).unwrap());
    spawner.spawn(jacks_task(cv, shared).unwrap());
    spawner.spawn(gates_task(clock_in, gates, shared, seed).unwrap());
    spawner.spawn(encoder_task(encoder, shared).unwrap());
    for (pin, role) in buttons {
        spawner.spawn(panel_button_task(pin, role, shared).unwrap());
    }

    info!("All tasks spawned");
}
