//! CV jacks on ADC0..ADC3.

use embassy_rp::adc::{self, Adc, Async, Channel};

use polygate::config::CV_CHANNEL_COUNT;
use polygate_io::{CvSource, IoError};

pub struct CvAdc {
    adc: Adc<'static, Async>,
    channels: [Channel<'static>; CV_CHANNEL_COUNT],
}

impl CvAdc {
    pub fn new(adc: Adc<'static, Async>, channels: [Channel<'static>; CV_CHANNEL_COUNT]) -> Self {
        Self { adc, channels }
    }

    /// Fold the low bit of repeated readings into a seed.
    pub async fn noise_seed(&mut self) -> u64 {
        let mut seed = 0u64;
        for i in 0..64 {
            let channel = &mut self.channels[i % CV_CHANNEL_COUNT];
            if let Ok(raw) = self.adc.read(channel).await {
                seed = (seed << 1) | u64::from(raw & 1);
            }
        }
        seed
    }
}

impl CvSource for CvAdc {
    type Error = adc::Error;

    async fn read_raw(&mut self) -> Result<[u16; CV_CHANNEL_COUNT], IoError<Self::Error>> {
        let mut raw = [0u16; CV_CHANNEL_COUNT];
        for (value, channel) in raw.iter_mut().zip(self.channels.iter_mut()) {
            *value = self.adc.read(channel).await?;
        }
        Ok(raw)
    }
}
