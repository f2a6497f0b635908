// SD card over SPI with FAT volume manager
// No RTC on board; new files are stamped 2025-01-01.

use embedded_hal::delay::DelayNs;
use embedded_hal::spi::SpiDevice;
use embedded_sdmmc::{SdCard, TimeSource, Timestamp, VolumeManager};
use log::{info, warn};

#[derive(Default, Clone, Copy)]
pub struct FixedTimeSource;

impl TimeSource for FixedTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 55,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdStorage<SPI, DELAY>
where
    SPI: SpiDevice,
    DELAY: DelayNs,
{
    pub volume_mgr: VolumeManager<SdCard<SPI, DELAY>, FixedTimeSource>,
}

impl<SPI, DELAY> SdStorage<SPI, DELAY>
where
    SPI: SpiDevice,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, delay: DELAY) -> Self {
        let sdcard = SdCard::new(spi, delay);

        match sdcard.num_bytes() {
            Ok(bytes) => info!("sd: {} bytes ({} MB)", bytes, bytes / 1024 / 1024),
            Err(e) => warn!("sd: probe failed: {:?}", e),
        }

        let volume_mgr = VolumeManager::new(sdcard, FixedTimeSource);
        Self { volume_mgr }
    }
}
