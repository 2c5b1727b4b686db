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

//! Palette-indexed mipmapped textures (`miptex_t`), as stored in both BSP texture lumps and WAD
//! texture libraries.
//!
//! A miptex begins with a 16-byte name field, a 32-bit width, a 32-bit height and 4 32-bit mipmap
//! offsets. The offsets are given in bytes from the beginning of the miptex. Each mipmap has its
//! dimensions halved from the previous one. A miptex whose offsets are all zero carries no pixel
//! data and must be looked up by name in an external texture library.
//!
//! Half-Life miptex additionally store their own palette after the last mipmap: a 16-bit color
//! count followed by that many RGB triples.

use std::io::{Cursor, Read};

use crate::common::{palette::Palette, util};

use byteorder::{LittleEndian, ReadBytesExt};
use failure::Error;

pub const MIPLEVELS: usize = 4;
const TEX_NAME_MAX: usize = 16;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MipLevel {
    Full = 0,
    Half = 1,
    Quarter = 2,
    Eighth = 3,
}

#[derive(Clone, Debug)]
pub struct MipTexture {
    name: String,
    width: u32,
    height: u32,
    mipmaps: [Vec<u8>; MIPLEVELS],
    palette: Option<Palette>,
}

impl MipTexture {
    /// An unnamed texture with no dimensions, used for missing texture slots.
    pub fn empty() -> MipTexture {
        MipTexture {
            name: String::new(),
            width: 0,
            height: 0,
            mipmaps: Default::default(),
            palette: None,
        }
    }

    /// Parses a miptex starting at the beginning of `data`.
    ///
    /// If `with_palette` is set, the embedded palette following the last mipmap is read as well.
    pub fn load(data: &[u8], with_palette: bool) -> Result<MipTexture, Error> {
        let mut reader = Cursor::new(data);

        let mut name_bytes = [0u8; TEX_NAME_MAX];
        reader.read_exact(&mut name_bytes)?;
        let name = util::fixed_name(&name_bytes);

        let width = reader.read_u32::<LittleEndian>()?;
        let height = reader.read_u32::<LittleEndian>()?;

        let mut mip_offsets = [0usize; MIPLEVELS];
        for m in 0..MIPLEVELS {
            mip_offsets[m] = reader.read_u32::<LittleEndian>()? as usize;
        }

        let mut texture = MipTexture {
            name,
            width,
            height,
            mipmaps: Default::default(),
            palette: None,
        };

        // external texture, only the header is present
        if mip_offsets.iter().all(|o| *o == 0) {
            return Ok(texture);
        }

        for m in 0..MIPLEVELS {
            let size = mip_size(width, height, m);
            let start = mip_offsets[m];
            ensure!(
                start.checked_add(size).map_or(false, |end| end <= data.len()),
                "Mipmap {} of texture {} out of bounds",
                m,
                texture.name
            );
            texture.mipmaps[m] = data[start..start + size].to_vec();
        }

        if with_palette {
            let palette_ofs = mip_offsets[MIPLEVELS - 1] + mip_size(width, height, MIPLEVELS - 1);
            reader.set_position(palette_ofs as u64);
            let color_count = reader.read_u16::<LittleEndian>()? as usize;
            ensure!(
                color_count <= 256,
                "Texture {} has too many palette entries ({})",
                texture.name,
                color_count
            );

            let mut rgb = vec![0u8; color_count * 3];
            reader.read_exact(&mut rgb)?;
            texture.palette = Some(Palette::from_partial(&rgb));
        }

        Ok(texture)
    }

    /// Returns the name of the texture.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns a tuple containing the width and height of the texture.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the texture's mipmap of the specified level.
    pub fn mipmap(&self, level: MipLevel) -> &[u8] {
        &self.mipmaps[level as usize]
    }

    /// Returns the palette stored alongside the texture, if any.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    /// Returns true if full-size pixel data is embedded in this texture.
    pub fn has_pixels(&self) -> bool {
        let full = self.mipmap(MipLevel::Full);
        !full.is_empty() && full.len() == mip_size(self.width, self.height, 0)
    }
}

fn mip_size(width: u32, height: u32, level: usize) -> usize {
    (width as usize >> level) * (height as usize >> level)
}
