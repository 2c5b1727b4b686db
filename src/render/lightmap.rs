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

//! Lightmap atlas packing and lightmap texture coordinates.
//!
//! Each face's lightmap patch is copied into a shared RGB8 atlas by a shelf packer: patches are
//! placed left to right along the current row, and a new row starts below the tallest patch of the
//! previous one when the next patch does not fit horizontally. The atlas width never changes; its
//! height doubles whenever a patch would overflow the bottom edge.

use crate::{
    common::bsp::{BspFace, LightmapFormat, TexInfoFlags, NO_LIGHT_STYLE},
    render::{
        face::UvBounds,
        image::{Image, ImageFormat},
    },
};

use cgmath::Vector2;

pub const DEFAULT_ATLAS_WIDTH: u32 = 256;
pub const DEFAULT_ATLAS_HEIGHT: u32 = 32;

// space left between patches to keep bilinear filtering from bleeding
const GUTTER: u32 = 2;

const FULLBRIGHT_TEXEL: [u8; 3] = [0xFF, 0xFF, 0xFF];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

#[derive(Debug)]
pub struct LightmapAtlas {
    width: u32,
    height: u32,
    data: Vec<u8>,

    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,

    allocations: Vec<Rect>,
}

impl LightmapAtlas {
    /// Creates an atlas and reserves its fullbright texel at the origin.
    pub fn new(width: u32, initial_height: u32) -> LightmapAtlas {
        let width = width.max(1);
        let height = initial_height.max(1);

        let mut atlas = LightmapAtlas {
            width,
            height,
            data: vec![0; width as usize * height as usize * 3],
            cursor_x: 0,
            cursor_y: 0,
            row_height: GUTTER,
            allocations: Vec::new(),
        };
        atlas.allocate(1, 1, &FULLBRIGHT_TEXEL);

        atlas
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

    /// Returns the RGB8 contents of the atlas.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The 1×1 white texel shared by every unlit face.
    pub fn fullbright_rect(&self) -> Rect {
        self.allocations[0]
    }

    /// Returns every rectangle allocated so far, starting with the fullbright texel.
    pub fn allocations(&self) -> &[Rect] {
        &self.allocations
    }

    /// Copies a `width`×`height` patch of RGB texels into the atlas and returns its placement.
    ///
    /// Patches wider than the atlas are clipped to the atlas width. `source` rows are read with a
    /// stride of `width * 3` bytes; missing source bytes leave the atlas zeroed.
    pub fn allocate(&mut self, width: u32, height: u32, source: &[u8]) -> Rect {
        let src_stride = width as usize * 3;
        let w = width.max(1).min(self.width);
        let h = height.max(1);

        if self.cursor_x + w > self.width {
            self.cursor_x = 0;
            self.cursor_y += self.row_height;
            self.row_height = GUTTER;
        }

        while self.cursor_y + h > self.height {
            self.grow();
        }

        let row_len = w as usize * 3;
        let dst_stride = self.width as usize * 3;
        for row in 0..h as usize {
            let src_start = row * src_stride;
            if src_start >= source.len() {
                break;
            }
            let src_end = (src_start + row_len).min(source.len());
            let src_row = &source[src_start..src_end];

            let dst_start =
                (self.cursor_y as usize + row) * dst_stride + self.cursor_x as usize * 3;
            self.data[dst_start..dst_start + src_row.len()].copy_from_slice(src_row);
        }

        let rect = Rect {
            x: self.cursor_x,
            y: self.cursor_y,
            width: w,
            height: h,
        };
        self.allocations.push(rect);

        self.cursor_x += w + GUTTER;
        self.row_height = self.row_height.max(h + GUTTER);

        rect
    }

    /// Allocates the lightmap patch of a face, or returns `None` if the face is fullbright.
    ///
    /// A face is fullbright if it has no lightmap, if its primary light style is unused, if its
    /// surface is special (sky or liquid), or if its samples do not fit in the lightmap lump.
    pub fn allocate_face(
        &mut self,
        format: LightmapFormat,
        lightmaps: &[u8],
        face: &BspFace,
        flags: TexInfoFlags,
        size: (u32, u32),
    ) -> Option<Rect> {
        let offset = face.lightmap_id?;
        if face.light_styles[0] == NO_LIGHT_STYLE || flags.contains(TexInfoFlags::SPECIAL) {
            return None;
        }

        let (width, height) = size;
        let samples = (width as usize).checked_mul(height as usize)?;
        let rgb = match format.expand(lightmaps, offset, samples) {
            Some(rgb) => rgb,
            None => {
                debug!(
                    "Lightmap of {}x{} samples at offset {} is out of range",
                    width, height, offset
                );
                return None;
            }
        };

        Some(self.allocate(width, height, &rgb))
    }

    fn grow(&mut self) {
        self.height *= 2;
        self.data
            .resize(self.width as usize * self.height as usize * 3, 0);
        debug!("Lightmap atlas grown to {}x{}", self.width, self.height);
    }

    /// Converts the atlas into an RGB8 image with mipmaps.
    pub fn into_image(self) -> Image {
        Image::with_mipmaps(ImageFormat::Rgb8, self.width, self.height, self.data)
    }
}

/// Normalizes a raw texture coordinate into `[0, 1]` over the face's bounds.
///
/// Axes along which the face has no finite extent map to 0.
pub fn local_uv(texcoord: Vector2<f32>, bounds: &UvBounds) -> Vector2<f32> {
    let extent = bounds.extent();
    let axis = |raw: f32, min: f32, extent: f32| {
        if extent.is_finite() && extent != 0.0 {
            (raw - min) / extent
        } else {
            0.0
        }
    };

    Vector2::new(
        axis(texcoord.x, bounds.min.x, extent.x),
        axis(texcoord.y, bounds.min.y, extent.y),
    )
}

/// Maps a face-local coordinate into an atlas rectangle, keeping samples on texel centers.
pub fn remap(local: Vector2<f32>, rect: &Rect, atlas_size: (u32, u32)) -> Vector2<f32> {
    let (atlas_w, atlas_h) = (atlas_size.0 as f32, atlas_size.1 as f32);

    Vector2::new(
        (rect.x as f32 + 0.5) / atlas_w + local.x * (rect.width as f32 - 1.0) / atlas_w,
        (rect.y as f32 + 0.5) / atlas_h + local.y * (rect.height as f32 - 1.0) / atlas_h,
    )
}

/// Returns the lightmap coordinate of a vertex on a lit face.
pub fn lightmap_uv(
    texcoord: Vector2<f32>,
    bounds: &UvBounds,
    rect: &Rect,
    atlas_size: (u32, u32),
) -> Vector2<f32> {
    remap(local_uv(texcoord, bounds), rect, atlas_size)
}

/// Returns the coordinate of the fullbright texel.
pub fn fullbright_uv(atlas_size: (u32, u32)) -> Vector2<f32> {
    Vector2::new(0.5 / atlas_size.0 as f32, 0.5 / atlas_size.1 as f32)
}
