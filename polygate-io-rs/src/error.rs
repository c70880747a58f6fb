//! Error type shared by the peripheral adapters.

use display_interface::DisplayError;

/// Failure talking to a peripheral.
///
/// `E` is the bus error of the concrete driver (I2C, ADC, flash). The
/// `ssd1306` crate already folds its bus errors into [`DisplayError`], so
/// the display uses `IoError<DisplayError>`.
#[derive(Debug, PartialEq, Eq)]
pub enum IoError<E> {
    /// Bus-level failure reported by the underlying driver.
    Bus(E),
    /// The device did not answer when first addressed; the feature it backs is off.
    DeviceAbsent,
    /// An operation was attempted before the device was initialised.
    NotInitialized,
    /// A stored document did not fit the buffer or failed to encode.
    Encoding,
}

impl<E> From<E> for IoError<E> {
    fn from(e: E) -> Self {
        IoError::Bus(e)
    }
}

impl<E> IoError<E> {
    /// `true` when retrying on the next cycle is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IoError::DeviceAbsent | IoError::NotInitialized)
    }
}

/// Error returned by [`OledDriver`](crate::OledDriver).
pub type OledError = IoError<DisplayError>;

#[cfg(feature = "defmt")]
impl<E> defmt::Format for IoError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            IoError::Bus(_e) => defmt::write!(f, "Bus error"),
            IoError::DeviceAbsent => defmt::write!(f, "Device absent"),
            IoError::NotInitialized => defmt::write!(f, "Not initialized"),
            IoError::Encoding => defmt::write!(f, "Encoding error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_errors_convert() {
        let e: IoError<u8> = 7u8.into();
        assert_eq!(e, IoError::Bus(7));
        assert!(!e.is_fatal());
    }

    #[test]
    fn absent_device_is_fatal() {
        assert!(IoError::<()>::DeviceAbsent.is_fatal());
        assert!(!IoError::<()>::Encoding.is_fatal());
    }
}
