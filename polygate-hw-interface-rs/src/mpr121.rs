//! MPR121 capacitive controller, read as twelve filtered electrode values.

use embedded_hal_async::i2c::I2c;

use polygate::gesture::{RawSample, SENSOR_COUNT};
use polygate_io::{IoError, TouchSensor};

pub const DEFAULT_ADDRESS: u8 = 0x5A;

/// CONFIG2 reads back this value after a soft reset.
const CONFIG2_RESET: u8 = 0x24;

const TOUCH_THRESHOLD: u8 = 12;
const RELEASE_THRESHOLD: u8 = 6;

#[allow(non_camel_case_types, clippy::upper_case_acronyms, dead_code)]
#[derive(Clone, Copy)]
enum Reg {
    FILTDATA_0L = 0x04,
    MHDR = 0x2b,
    NHDR = 0x2c,
    NCLR = 0x2d,
    FDLR = 0x2e,
    MHDF = 0x2f,
    NHDF = 0x30,
    NCLF = 0x31,
    FDLF = 0x32,
    TOUCHTH_0 = 0x41,
    RELEASETH_0 = 0x42,
    DEBOUNCE = 0x5b,
    CONFIG1 = 0x5c,
    CONFIG2 = 0x5d,
    ECR = 0x5e,
    AUTOCONFIG0 = 0x7b,
    UPLIMIT = 0x7d,
    LOWLIMIT = 0x7e,
    TARGETLIMIT = 0x7f,
    SOFTRESET = 0x80,
}

pub struct Mpr121<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Mpr121<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    async fn write(&mut self, reg: Reg, offset: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[reg as u8 + offset, value]).await
    }

    async fn configure(&mut self) -> Result<(), I2C::Error> {
        for i in 0..SENSOR_COUNT as u8 {
            self.write(Reg::TOUCHTH_0, 2 * i, TOUCH_THRESHOLD).await?;
            self.write(Reg::RELEASETH_0, 2 * i, RELEASE_THRESHOLD).await?;
        }

        for (reg, value) in [
            (Reg::MHDR, 0x01),
            (Reg::NHDR, 0x01),
            (Reg::NCLR, 0x0e),
            (Reg::FDLR, 0x00),
            (Reg::MHDF, 0x01),
            (Reg::NHDF, 0x05),
            (Reg::NCLF, 0x01),
            (Reg::FDLF, 0x00),
            (Reg::DEBOUNCE, 0x00),
            (Reg::CONFIG1, 0x10), // 16 uA charge current
            (Reg::CONFIG2, 0x20), // 0.5 us encoding, 1 ms period
            // autoconfig for Vdd = 3.3 V
            (Reg::AUTOCONFIG0, 0x0b),
            (Reg::UPLIMIT, 200),
            (Reg::TARGETLIMIT, 180),
            (Reg::LOWLIMIT, 130),
        ] {
            self.write(reg, 0, value).await?;
        }

        // run all twelve electrodes
        self.write(Reg::ECR, 0, 0x80 + SENSOR_COUNT as u8).await
    }
}

impl<I2C: I2c> TouchSensor for Mpr121<I2C> {
    type Error = I2C::Error;

    async fn detect(&mut self) -> Result<(), IoError<Self::Error>> {
        self.write(Reg::SOFTRESET, 0, 0x63).await.map_err(|_| IoError::DeviceAbsent)?;
        self.write(Reg::ECR, 0, 0x00).await?;

        let mut config2 = [0u8];
        self.i2c.write_read(self.address, &[Reg::CONFIG2 as u8], &mut config2).await?;
        if config2[0] != CONFIG2_RESET {
            return Err(IoError::DeviceAbsent);
        }

        self.configure().await?;
        Ok(())
    }

    async fn read_raw(&mut self) -> Result<RawSample, IoError<Self::Error>> {
        let mut buf = [0u8; 2 * SENSOR_COUNT];
        self.i2c.write_read(self.address, &[Reg::FILTDATA_0L as u8], &mut buf).await?;

        let mut sample = [0u16; SENSOR_COUNT];
        for (value, bytes) in sample.iter_mut().zip(buf.chunks_exact(2)) {
            *value = u16::from_le_bytes([bytes[0], bytes[1]]) & 0x03ff;
        }
        Ok(sample)
    }
}
