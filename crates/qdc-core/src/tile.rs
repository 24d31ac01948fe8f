//! Single QDC tile representation.
//!
//! Only three things in a tile file are interpreted: its total size (which
//! selects the layout variant), two little-endian `i16` origin codes in the
//! header, and the fixed-stride record raster of the selected layer. All other
//! bytes are opaque.

use crate::layer::{LayerProfile, SizeVariant, RECORD_STRIDE};
use crate::{QdcError, Result};
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Header offset of the Y origin code.
pub const Y_ORIGIN_OFFSET: u64 = 160;

/// Header offset of the X origin code.
pub const X_ORIGIN_OFFSET: u64 = 164;

/// Position of a tile in the global angular grid, in origin-code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileOrigin {
    /// X origin code (longitude direction).
    pub x: i16,
    /// Y origin code (latitude direction).
    pub y: i16,
}

impl TileOrigin {
    /// Read the origin codes from the header of a tile file.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| QdcError::io("open", path, e))?;
        Self::read_header(&mut file).map_err(|e| QdcError::io("read header", path, e))
    }

    fn read_header<R: Read + Seek>(r: &mut R) -> std::io::Result<Self> {
        r.seek(SeekFrom::Start(X_ORIGIN_OFFSET))?;
        let x = r.read_i16::<LittleEndian>()?;
        r.seek(SeekFrom::Start(Y_ORIGIN_OFFSET))?;
        let y = r.read_i16::<LittleEndian>()?;
        Ok(Self { x, y })
    }
}

/// A tile file whose size matched one of the layer's layout variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTile {
    /// Path of the tile file.
    pub path: PathBuf,
    /// Layout variant selected by the file size.
    pub variant: SizeVariant,
}

impl MatchedTile {
    /// Stat a file and match its size against the profile.
    ///
    /// Returns `Ok(None)` for files that match no variant.
    pub fn probe<P: AsRef<Path>>(profile: &LayerProfile, path: P) -> Result<Option<Self>> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)
            .map_err(|e| QdcError::io("stat", path, e))?
            .len();
        Ok(profile.match_size(size).map(|variant| Self {
            path: path.to_path_buf(),
            variant,
        }))
    }
}

/// One depth/validity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Depth in centimeters.
    pub depth: i16,
    /// Validity code; zero means no reading.
    pub code: i16,
}

/// A tile loaded into memory.
#[derive(Debug)]
pub struct QdcTile {
    data: Vec<u8>,
    origin: TileOrigin,
    record_offset: usize,
    record_count: usize,
}

impl QdcTile {
    /// Load a matched tile file.
    pub fn from_file(profile: &LayerProfile, tile: &MatchedTile) -> Result<Self> {
        let data = std::fs::read(&tile.path).map_err(|e| QdcError::io("read", &tile.path, e))?;
        Self::from_bytes(profile, tile.variant, data).map_err(|e| QdcError::io("read", &tile.path, e))
    }

    /// Wrap raw tile bytes laid out according to `variant`.
    ///
    /// Fails with `UnexpectedEof` if the buffer ends before the last record.
    pub fn from_bytes(
        profile: &LayerProfile,
        variant: SizeVariant,
        data: Vec<u8>,
    ) -> std::io::Result<Self> {
        if variant.record_offset == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "record offset must leave room for the leading depth byte",
            ));
        }
        let record_count = profile.record_count();
        // depth at offset - 1 + 4i, code at offset + 1 + 4i
        let end = variant.record_offset + 1 + RECORD_STRIDE * (record_count - 1) + 2;
        let header_end = (X_ORIGIN_OFFSET + 2) as usize;
        if data.len() < end.max(header_end) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "tile holds {} bytes, layer {} needs {}",
                    data.len(),
                    profile.layer(),
                    end.max(header_end)
                ),
            ));
        }

        let x = LittleEndian::read_i16(&data[X_ORIGIN_OFFSET as usize..]);
        let y = LittleEndian::read_i16(&data[Y_ORIGIN_OFFSET as usize..]);

        Ok(Self {
            data,
            origin: TileOrigin { x, y },
            record_offset: variant.record_offset,
            record_count,
        })
    }

    /// Origin codes of this tile.
    pub fn origin(&self) -> TileOrigin {
        self.origin
    }

    /// Number of records in the raster.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Validity code of record `index`.
    pub fn code(&self, index: usize) -> i16 {
        let at = self.record_offset + 1 + RECORD_STRIDE * index;
        LittleEndian::read_i16(&self.data[at..at + 2])
    }

    /// Depth of record `index`, in centimeters.
    pub fn depth(&self, index: usize) -> i16 {
        let at = self.record_offset - 1 + RECORD_STRIDE * index;
        LittleEndian::read_i16(&self.data[at..at + 2])
    }

    /// Both halves of record `index`.
    pub fn record(&self, index: usize) -> Record {
        Record {
            depth: self.depth(index),
            code: self.code(index),
        }
    }
}
