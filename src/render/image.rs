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

//! Decoded images handed to the renderer.

use std::io::Write;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ImageFormat {
    Rgb8,
    Rgba8,
}

impl ImageFormat {
    pub fn channels(self) -> usize {
        match self {
            ImageFormat::Rgb8 => 3,
            ImageFormat::Rgba8 => 4,
        }
    }
}

/// A tightly packed image with a complete mip chain.
///
/// Level 0 is the full image. Every following level halves both dimensions (never below 1) with a
/// 2×2 box filter, down to a 1×1 level.
#[derive(Clone, Debug)]
pub struct Image {
    format: ImageFormat,
    width: u32,
    height: u32,
    mipmaps: Vec<Vec<u8>>,
}

impl Image {
    /// Builds an image and its mip chain from level 0 pixels.
    ///
    /// `data` must hold exactly `width * height` pixels of `format`.
    pub fn with_mipmaps(format: ImageFormat, width: u32, height: u32, data: Vec<u8>) -> Image {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * format.channels()
        );

        let mut mipmaps = vec![data];
        let (mut w, mut h) = (width, height);
        while w > 0 && h > 0 && (w > 1 || h > 1) {
            let next = downsample(format.channels(), w, h, &mipmaps[mipmaps.len() - 1]);
            w = (w / 2).max(1);
            h = (h / 2).max(1);
            mipmaps.push(next);
        }

        Image {
            format,
            width,
            height,
            mipmaps,
        }
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Returns the pixels of the full-size image.
    pub fn data(&self) -> &[u8] {
        &self.mipmaps[0]
    }

    pub fn mip_count(&self) -> usize {
        self.mipmaps.len()
    }

    pub fn mipmap(&self, level: usize) -> Option<&[u8]> {
        self.mipmaps.get(level).map(|m| m.as_slice())
    }

    /// Encodes the full-size image as an 8-bit PNG.
    pub fn write_png<W>(&self, writer: W) -> Result<(), png::EncodingError>
    where
        W: Write,
    {
        let mut encoder = png::Encoder::new(writer, self.width, self.height);
        encoder.set_color(match self.format {
            ImageFormat::Rgb8 => png::ColorType::Rgb,
            ImageFormat::Rgba8 => png::ColorType::Rgba,
        });
        encoder.set_depth(png::BitDepth::Eight);

        let mut png_writer = encoder.write_header()?;
        png_writer.write_image_data(self.data())
    }
}

fn downsample(channels: usize, width: u32, height: u32, src: &[u8]) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let dst_w = (w / 2).max(1);
    let dst_h = (h / 2).max(1);

    let mut dst = Vec::with_capacity(dst_w * dst_h * channels);
    for y in 0..dst_h {
        for x in 0..dst_w {
            // odd or unit dimensions clamp to the last source row/column
            let x0 = (2 * x).min(w - 1);
            let x1 = (2 * x + 1).min(w - 1);
            let y0 = (2 * y).min(h - 1);
            let y1 = (2 * y + 1).min(h - 1);

            for c in 0..channels {
                let sum = src[(y0 * w + x0) * channels + c] as u32
                    + src[(y0 * w + x1) * channels + c] as u32
                    + src[(y1 * w + x0) * channels + c] as u32
                    + src[(y1 * w + x1) * channels + c] as u32;
                dst.push(((sum + 2) / 4) as u8);
            }
        }
    }

    dst
}
