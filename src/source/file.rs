//! File packet source: sequential 188-byte reads from a capture file

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;

use tracing::warn;

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::error::{Error, Result};
use crate::packet::{PacketMetadata, TsPacket};
use crate::source::PacketSource;

/// Reads TS packets from a file. Packets with a bad sync byte are skipped.
/// Files carry no input timestamps; the executor stamps each batch.
pub struct FileSource {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    sync_losses: u64,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            reader: None,
            sync_losses: 0,
        }
    }

    /// Read one full packet, treating a clean or mid-packet EOF as end of
    /// input.
    fn read_packet(reader: &mut BufReader<File>, buf: &mut [u8; TS_PACKET_SIZE]) -> Result<bool> {
        match reader.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl PacketSource for FileSource {
    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| Error::SourceOpen {
            name: self.path.display().to_string(),
            source: e,
        })?;
        self.reader = Some(BufReader::new(file));
        Ok(())
    }

    fn receive(
        &mut self,
        packets: &mut [TsPacket],
        _metadata: &mut [PacketMetadata],
    ) -> Result<usize> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(0);
        };
        let mut filled = 0;
        let mut buf = [0u8; TS_PACKET_SIZE];
        while filled < packets.len() {
            if !Self::read_packet(reader, &mut buf)? {
                break; // end of input
            }
            if buf[0] != TS_SYNC_BYTE {
                if self.sync_losses == 0 {
                    warn!(file = %self.path.display(), "lost TS sync, skipping packet");
                }
                self.sync_losses += 1;
                continue;
            }
            packets[filled] = TsPacket::new(buf);
            filled += 1;
        }
        Ok(filled)
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
