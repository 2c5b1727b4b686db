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

//! Per-face polygon reconstruction.

use crate::{common::bsp::BspData, render::lightmap::Rect};

use cgmath::{Vector2, Vector3};

/// Edge length in texels of the block covered by one lightmap sample.
pub const LIGHTMAP_BLOCK_SIZE: f32 = 16.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FaceVertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    /// Unnormalized texture-space coordinates.
    pub texcoord: Vector2<f32>,
}

/// Bounds of a face's raw texture coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UvBounds {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl UvBounds {
    /// Computes the bounds of a set of texture coordinates. An empty set has zero-sized bounds at
    /// the origin.
    pub fn from_texcoords<I>(texcoords: I) -> UvBounds
    where
        I: IntoIterator<Item = Vector2<f32>>,
    {
        let mut min = Vector2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vector2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for uv in texcoords {
            for component in 0..2 {
                min[component] = min[component].min(uv[component]);
                max[component] = max[component].max(uv[component]);
            }
        }

        if min.x > max.x || min.y > max.y {
            return UvBounds {
                min: Vector2::new(0.0, 0.0),
                max: Vector2::new(0.0, 0.0),
            };
        }

        UvBounds { min, max }
    }

    pub fn extent(&self) -> Vector2<f32> {
        self.max - self.min
    }

    /// Returns the dimensions in samples of the lightmap patch covering these bounds.
    pub fn lightmap_size(&self) -> (u32, u32) {
        let samples = |min: f32, max: f32| {
            let n = (max / LIGHTMAP_BLOCK_SIZE).ceil() - (min / LIGHTMAP_BLOCK_SIZE).floor() + 1.0;
            if n.is_finite() && n >= 1.0 {
                n as u32
            } else {
                1
            }
        };

        (
            samples(self.min.x, self.max.x),
            samples(self.min.y, self.max.y),
        )
    }
}

/// A face polygon ready for lightmap allocation and triangulation.
#[derive(Clone, Debug)]
pub struct ResolvedFace {
    pub face_id: usize,
    pub texture_id: usize,
    /// Polygon vertices in edge-loop order.
    pub vertices: Vec<FaceVertex>,
    pub bounds: UvBounds,
    /// Atlas placement of the face's lightmap, or `None` if the face is fullbright.
    pub lightmap: Option<Rect>,
}

impl ResolvedFace {
    pub fn lightmap_size(&self) -> (u32, u32) {
        self.bounds.lightmap_size()
    }

    /// Returns the number of triangles this face contributes.
    pub fn triangle_count(&self) -> usize {
        self.vertices.len().saturating_sub(2)
    }
}

/// Walks the edge loop of a face into an ordered polygon.
///
/// All indices are validated when the BSP is loaded, so this cannot fail.
pub fn resolve_face(bsp: &BspData, face_id: usize) -> ResolvedFace {
    let texinfo = bsp.face_texinfo(face_id);
    let normal = bsp.face_normal(face_id);

    let vertices: Vec<FaceVertex> = bsp
        .face_iter_vertices(face_id)
        .map(|position| FaceVertex {
            position,
            normal,
            texcoord: texinfo.texcoords(position),
        })
        .collect();

    if vertices.len() < 3 {
        trace!(
            "Face {} has {} vertices, no triangles",
            face_id,
            vertices.len()
        );
    }

    let bounds = UvBounds::from_texcoords(vertices.iter().map(|v| v.texcoord));

    ResolvedFace {
        face_id,
        texture_id: texinfo.tex_id,
        vertices,
        bounds,
        lightmap: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::bsp::{self, load::tests::BspBuilder, BspVersion};

    #[test]
    fn test_resolve_quad() {
        let bsp = bsp::load(&BspBuilder::quad(BspVersion::GoldSrc).build()).unwrap();
        let face = resolve_face(&bsp, 0);

        assert_eq!(face.texture_id, 0);
        assert_eq!(face.vertices.len(), 4);
        assert_eq!(face.triangle_count(), 2);
        assert_eq!(face.vertices[2].position, Vector3::new(32.0, 32.0, 0.0));
        assert_eq!(face.vertices[2].texcoord, Vector2::new(32.0, 32.0));
        assert_eq!(face.vertices[0].normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(face.bounds.min, Vector2::new(0.0, 0.0));
        assert_eq!(face.bounds.max, Vector2::new(32.0, 32.0));
        assert_eq!(face.lightmap_size(), (3, 3));
    }

    #[test]
    fn test_back_side_flips_normal() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.faces[0].side = 1;
        let bsp = bsp::load(&builder.build()).unwrap();
        let face = resolve_face(&bsp, 0);
        assert_eq!(face.vertices[0].normal, Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_texinfo_offsets() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.texinfo[0] = ([0.5, 0.0, 0.0, 8.0], [0.0, -1.0, 0.0, 4.0], 0);
        let bsp = bsp::load(&builder.build()).unwrap();
        let face = resolve_face(&bsp, 0);

        assert_eq!(face.vertices[1].texcoord, Vector2::new(24.0, 4.0));
        assert_eq!(face.bounds.min, Vector2::new(8.0, -28.0));
        assert_eq!(face.bounds.max, Vector2::new(24.0, 4.0));
    }

    #[test]
    fn test_lightmap_size() {
        let bounds = UvBounds {
            min: Vector2::new(-8.0, 0.0),
            max: Vector2::new(40.0, 0.0),
        };
        // ceil(2.5) - floor(-0.5) + 1
        assert_eq!(bounds.lightmap_size(), (5, 1));
    }

    #[test]
    fn test_degenerate_face() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.faces[0].edge_count = 2;
        let bsp = bsp::load(&builder.build()).unwrap();
        let face = resolve_face(&bsp, 0);

        assert_eq!(face.vertices.len(), 2);
        assert_eq!(face.triangle_count(), 0);
    }

    #[test]
    fn test_empty_bounds() {
        let bounds = UvBounds::from_texcoords(Vec::new());
        assert_eq!(bounds.extent(), Vector2::new(0.0, 0.0));
        assert_eq!(bounds.lightmap_size(), (1, 1));
    }
}
