//! Configuration document in the last flash sector.

use embassy_rp::flash::{Blocking, Error, Flash, ERASE_SIZE};
use embassy_rp::peripherals::FLASH;

use polygate::PersistedDocument;
use polygate_io::{decode_document, encode_document, DocumentStore, IoError, DOCUMENT_CAPACITY};

/// Pico 2 on-board QSPI flash.
pub const FLASH_SIZE: usize = 4 * 1024 * 1024;

const DOCUMENT_OFFSET: u32 = (FLASH_SIZE - ERASE_SIZE) as u32;

pub struct FlashStore {
    flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>,
    buf: [u8; DOCUMENT_CAPACITY],
}

impl FlashStore {
    pub fn new(flash: Flash<'static, FLASH, Blocking, FLASH_SIZE>) -> Self {
        Self {
            flash,
            buf: [0; DOCUMENT_CAPACITY],
        }
    }
}

impl DocumentStore for FlashStore {
    type Error = Error;

    async fn load(&mut self) -> Result<Option<PersistedDocument>, IoError<Self::Error>> {
        self.flash.blocking_read(DOCUMENT_OFFSET, &mut self.buf)?;
        Ok(decode_document(&self.buf))
    }

    async fn save(&mut self, doc: &PersistedDocument) -> Result<(), IoError<Self::Error>> {
        self.buf.fill(0xFF);
        encode_document::<Error>(doc, &mut self.buf)?;
        self.flash
            .blocking_erase(DOCUMENT_OFFSET, DOCUMENT_OFFSET + ERASE_SIZE as u32)?;
        self.flash.blocking_write(DOCUMENT_OFFSET, &self.buf)?;
        Ok(())
    }
}
