// Copyright © 2018 Cormac O'Brien
//
// Permission is hereby granted, free of charge, to any person obtaining a copy of this software
// and associated documentation files (the "Software"), to deal in the Software without
// restriction, including without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all copies or
// substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING
// BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
// DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! WAD2 (Quake) and WAD3 (Half-Life) texture libraries.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use crate::common::{miptex::MipTexture, util};

use byteorder::{LittleEndian, ReadBytesExt};

// see definition of lumpinfo_t:
// https://github.com/id-Software/Quake/blob/master/WinQuake/wad.h#L54-L63
const LUMPINFO_SIZE: u64 = 32;
const MAGIC_WAD2: u32 = 'W' as u32 | ('A' as u32) << 8 | ('D' as u32) << 16 | ('2' as u32) << 24;
const MAGIC_WAD3: u32 = 'W' as u32 | ('A' as u32) << 8 | ('D' as u32) << 16 | ('3' as u32) << 24;

const TYPE_MIPTEX_WAD3: u8 = 0x43;
const TYPE_MIPTEX_WAD2: u8 = 0x44;

#[derive(Debug, Fail)]
pub enum WadError {
    #[fail(display = "I/O error reading WAD: {}", _0)]
    Io(#[cause] io::Error),
    #[fail(display = "Bad magic number for WAD: {:#010x}", _0)]
    BadMagic(u32),
    #[fail(display = "Lump {} is compressed", _0)]
    Compressed(String),
    #[fail(display = "Lump {} is not a miptex (type {:#04x})", _0, _1)]
    NotMiptex(String, u8),
    #[fail(display = "Invalid miptex {}: {}", _0, _1)]
    InvalidMiptex(String, String),
    #[fail(display = "File not found in WAD: {}", _0)]
    NoSuchFile(String),
}

impl From<io::Error> for WadError {
    fn from(error: io::Error) -> Self {
        WadError::Io(error)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WadVersion {
    Wad2,
    Wad3,
}

struct LumpInfo {
    offset: u32,
    size: u32,
    kind: u8,
    compression: u8,
    name: String,
}

#[derive(Debug)]
struct WadLump {
    kind: u8,
    data: Box<[u8]>,
}

#[derive(Debug)]
pub struct Wad {
    version: WadVersion,
    files: HashMap<String, WadLump>,
}

impl Wad {
    pub fn load<R>(data: R) -> Result<Wad, WadError>
    where
        R: Read + Seek,
    {
        let mut reader = BufReader::new(data);

        let version = match reader.read_u32::<LittleEndian>()? {
            MAGIC_WAD2 => WadVersion::Wad2,
            MAGIC_WAD3 => WadVersion::Wad3,
            magic => return Err(WadError::BadMagic(magic)),
        };

        let lump_count = reader.read_u32::<LittleEndian>()?;
        let lumpinfo_ofs = reader.read_u32::<LittleEndian>()?;

        let mut lump_infos = Vec::new();

        for i in 0..lump_count as u64 {
            reader.seek(SeekFrom::Start(lumpinfo_ofs as u64 + i * LUMPINFO_SIZE))?;

            let offset = reader.read_u32::<LittleEndian>()?;
            let _size_on_disk = reader.read_u32::<LittleEndian>()?;
            let size = reader.read_u32::<LittleEndian>()?;
            let kind = reader.read_u8()?;
            let compression = reader.read_u8()?;
            let _pad = reader.read_u16::<LittleEndian>()?;
            let mut name_bytes = [0u8; 16];
            reader.read_exact(&mut name_bytes)?;
            let name = util::fixed_name(&name_bytes);
            trace!("WAD lump {}: {} ({} bytes, type {:#04x})", i, name, size, kind);

            lump_infos.push(LumpInfo {
                offset,
                size,
                kind,
                compression,
                name,
            });
        }

        let mut files = HashMap::new();

        for lump_info in lump_infos {
            if lump_info.compression != 0 {
                // no shipped WAD uses compression; the lump is kept out of the directory
                warn!("{}", WadError::Compressed(lump_info.name));
                continue;
            }

            let mut data = Vec::with_capacity(lump_info.size as usize);
            reader.seek(SeekFrom::Start(lump_info.offset as u64))?;
            (&mut reader)
                .take(lump_info.size as u64)
                .read_to_end(&mut data)?;

            // names are matched case-insensitively, first entry wins
            files
                .entry(lump_info.name.to_uppercase())
                .or_insert(WadLump {
                    kind: lump_info.kind,
                    data: data.into_boxed_slice(),
                });
        }

        debug!("Loaded {:?} with {} lumps", version, files.len());

        Ok(Wad { version, files })
    }

    /// Opens and loads the WAD at `path`.
    pub fn open<P>(path: P) -> Result<Wad, WadError>
    where
        P: AsRef<Path>,
    {
        Wad::load(File::open(path)?)
    }

    pub fn version(&self) -> WadVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Returns true if a lump with the given name exists, ignoring case.
    pub fn contains<S>(&self, name: S) -> bool
    where
        S: AsRef<str>,
    {
        self.files.contains_key(&name.as_ref().to_uppercase())
    }

    /// Returns the raw contents of the named lump, ignoring case.
    pub fn open_lump<S>(&self, name: S) -> Result<&[u8], WadError>
    where
        S: AsRef<str>,
    {
        match self.files.get(&name.as_ref().to_uppercase()) {
            Some(lump) => Ok(&lump.data),
            None => Err(WadError::NoSuchFile(name.as_ref().to_owned())),
        }
    }

    /// Decodes the named miptex lump, ignoring case.
    ///
    /// WAD3 textures carry their own palette; WAD2 textures must be translated with an external
    /// palette.
    pub fn open_miptex<S>(&self, name: S) -> Result<MipTexture, WadError>
    where
        S: AsRef<str>,
    {
        let name = name.as_ref();
        let lump = match self.files.get(&name.to_uppercase()) {
            Some(l) => l,
            None => return Err(WadError::NoSuchFile(name.to_owned())),
        };

        let with_palette = match lump.kind {
            TYPE_MIPTEX_WAD3 => true,
            TYPE_MIPTEX_WAD2 => false,
            k => return Err(WadError::NotMiptex(name.to_owned(), k)),
        };

        MipTexture::load(&lump.data, with_palette)
            .map_err(|e| WadError::InvalidMiptex(name.to_owned(), e.to_string()))
    }
}
