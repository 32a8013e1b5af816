use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::constants::disk_geometry::{CYLINDERS, SECTORS, SECTOR_SIZE, TRACKS};
use crate::word::Word;

const WORD_COUNT: usize = CYLINDERS * TRACKS * SECTORS * SECTOR_SIZE;

/// Sector-addressable block store: cylinders x tracks x sectors of
/// fixed-size word buffers, stored flat.
pub struct Disk {
    words: Vec<Word>,
}

pub type SharedDisk = Arc<Mutex<Disk>>;

impl Disk {
    pub fn new() -> Disk {
        Disk {
            words: vec![Word::ZERO; WORD_COUNT],
        }
    }

    /// Word offset of a sector, or None when the geometry is out of range.
    fn sector_offset(cylinder: usize, track: usize, sector: usize) -> Option<usize> {
        if cylinder >= CYLINDERS || track >= TRACKS || sector >= SECTORS {
            return None;
        }
        Some(((cylinder * TRACKS + track) * SECTORS + sector) * SECTOR_SIZE)
    }

    pub fn read_sector(
        &self,
        cylinder: usize,
        track: usize,
        sector: usize,
    ) -> Option<[Word; SECTOR_SIZE]> {
        let offset = Disk::sector_offset(cylinder, track, sector)?;
        let mut buffer = [Word::ZERO; SECTOR_SIZE];
        buffer.copy_from_slice(&self.words[offset..offset + SECTOR_SIZE]);
        Some(buffer)
    }

    /// Returns false when the geometry is out of range.
    pub fn write_sector(
        &mut self,
        cylinder: usize,
        track: usize,
        sector: usize,
        data: &[Word; SECTOR_SIZE],
    ) -> bool {
        match Disk::sector_offset(cylinder, track, sector) {
            Some(offset) => {
                self.words[offset..offset + SECTOR_SIZE].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    /// Load the persisted image. A missing file yields a fresh zeroed disk,
    /// written out immediately so the image exists from the first run.
    ///
    /// The blob is the in-memory word array verbatim: a sign byte followed
    /// by the magnitude, per word. No versioning, no endianness promise
    /// beyond what the encoding below fixes.
    pub fn load(path: &Path) -> io::Result<Disk> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                let disk = Disk::new();
                disk.save(path)?;
                return Ok(disk);
            }
            Err(error) => return Err(error),
        };

        let mut reader = BufReader::new(file);
        let mut words = Vec::with_capacity(WORD_COUNT);
        for _ in 0..WORD_COUNT {
            let negative = reader.read_u8()? != 0;
            let digits = reader.read_u32::<LittleEndian>()?;
            words.push(Word { negative, digits });
        }
        Ok(Disk { words })
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for word in &self.words {
            writer.write_u8(word.negative as u8)?;
            writer.write_u32::<LittleEndian>(word.digits)?;
        }
        writer.flush()
    }
}
