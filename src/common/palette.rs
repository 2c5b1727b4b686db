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

//! 256-color palettes used to translate palette-indexed textures into RGBA.

use std::io::{self, Read};

const PALETTE_SIZE: usize = 768;

#[derive(Debug, Fail)]
pub enum PaletteError {
    #[fail(display = "Bad palette length: expected {} bytes, got {}", _0, _1)]
    BadLength(usize, usize),
    #[fail(display = "I/O error reading palette: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for PaletteError {
    fn from(error: io::Error) -> Self {
        PaletteError::Io(error)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    rgb: [[u8; 3]; 256],
}

impl Palette {
    /// Constructs a palette from exactly 768 bytes of packed RGB data.
    pub fn new(data: &[u8]) -> Result<Palette, PaletteError> {
        if data.len() != PALETTE_SIZE {
            return Err(PaletteError::BadLength(PALETTE_SIZE, data.len()));
        }

        Ok(Palette::from_partial(data))
    }

    /// Constructs a palette from at most 256 packed RGB entries.
    ///
    /// Missing entries are black and any trailing partial entry is ignored.
    pub(crate) fn from_partial(data: &[u8]) -> Palette {
        let mut rgb = [[0; 3]; 256];
        for (color, entry) in data.chunks_exact(3).take(256).enumerate() {
            rgb[color].copy_from_slice(entry);
        }

        Palette { rgb }
    }

    /// Reads a raw palette lump such as `gfx/palette.lmp`.
    pub fn load<R>(mut data: R) -> Result<Palette, PaletteError>
    where
        R: Read,
    {
        let mut bytes = [0u8; PALETTE_SIZE];
        data.read_exact(&mut bytes)?;
        Ok(Palette::from_partial(&bytes))
    }

    /// A palette mapping each index to the gray level of the same value.
    pub fn grayscale() -> Palette {
        let mut rgb = [[0; 3]; 256];
        for (i, color) in rgb.iter_mut().enumerate() {
            *color = [i as u8; 3];
        }

        Palette { rgb }
    }

    pub fn rgb(&self, index: u8) -> [u8; 3] {
        self.rgb[index as usize]
    }

    /// Translates a set of indices into RGBA values. Every pixel is opaque.
    pub fn rgba(&self, indices: &[u8]) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(indices.len() * 4);

        for index in indices {
            rgba.extend_from_slice(&self.rgb[*index as usize]);
            rgba.push(0xFF);
        }

        rgba
    }
}
