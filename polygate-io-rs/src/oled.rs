//! SSD1306 128×64 panel in async buffered graphics mode.
//!
//! [`OledDriver`] owns the panel for its whole life: construction without
//! bus traffic, an explicit async power-up, then whole-frame redraws from
//! a [`DisplayFrame`].

use display_interface_i2c::I2CInterface;
use embedded_hal_async::i2c::I2c;
use ssd1306::{mode::BufferedGraphicsModeAsync, prelude::*, I2CDisplayInterface, Ssd1306Async};

use crate::display::{render_display, DisplayConfig, DisplayFrame};
use crate::error::{IoError, OledError};

/// Concrete panel type wrapped by [`OledDriver`].
type Panel<I2C> =
    Ssd1306Async<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsModeAsync<DisplaySize128x64>>;

/// Async driver for the 128×64 status panel over I2C.
///
/// Keeps the [`ssd1306`] frame buffer in RAM and redraws all of it from a
/// [`DisplayFrame`] on every [`show`](Self::show).
///
/// # Lifecycle
///
/// 1. [`OledDriver::new()`]: builds the driver, no I2C traffic.
/// 2. [`OledDriver::init()`]: sends the SSD1306 power-up sequence.
/// 3. [`OledDriver::show()`]: clears the buffer, renders the frame and
///    flushes it to the panel. Call it again for every new frame.
///
/// # Example
///
/// ```no_run
/// use polygate::ConfigStateMachine;
/// use polygate_io::{DisplayConfig, DisplayFrame, OledDriver};
///
/// # async fn example(i2c: impl embedded_hal_async::i2c::I2c) {
/// let machine = ConfigStateMachine::new();
/// let mut oled = OledDriver::new(i2c, 0x3C);
/// oled.init().await.unwrap();
///
/// let frame = DisplayFrame::from_snapshot(&machine.display_snapshot());
/// oled.show(&frame, &DisplayConfig::default()).await.unwrap();
/// # }
/// ```
pub struct OledDriver<I2C> {
    panel: Panel<I2C>,
    /// Set after a successful `init()`; `show()` refuses to draw before.
    ready: bool,
}

impl<I2C> OledDriver<I2C>
where
    I2C: I2c,
{
    /// Construct an uninitialised driver.
    ///
    /// No I2C traffic is generated. Call [`init()`](Self::init) before the
    /// first [`show()`](Self::show).
    ///
    /// # Arguments
    /// * `i2c`: bus handle, usually an `I2cDevice` on the shared bus.
    /// * `address`: 7-bit I2C device address (`0x3C` or `0x3D`).
    pub fn new(i2c: I2C, address: u8) -> Self {
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        Self {
            panel: Ssd1306Async::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
                .into_buffered_graphics_mode(),
            ready: false,
        }
    }

    /// Send the controller's power-up sequence.
    ///
    /// Marks the driver ready on success. Must succeed once before any
    /// frame is shown.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::DeviceAbsent`] if the panel does not answer.
    pub async fn init(&mut self) -> Result<(), OledError> {
        self.panel.init().await.map_err(|_| IoError::DeviceAbsent)?;
        self.ready = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.ready
    }

    /// Redraw the whole buffer from `frame` and push it to the panel.
    ///
    /// A full frame is 1 KiB, roughly 20 ms at 400 kHz.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::NotInitialized`] before a successful
    /// [`init()`](Self::init), or [`IoError::Bus`] when drawing or the
    /// transfer fails.
    pub async fn show(&mut self, frame: &DisplayFrame, config: &DisplayConfig) -> Result<(), OledError> {
        if !self.ready {
            return Err(IoError::NotInitialized);
        }
        self.panel.clear_buffer();
        render_display(&mut self.panel, frame, config)?;
        self.panel.flush().await?;
        Ok(())
    }
}
