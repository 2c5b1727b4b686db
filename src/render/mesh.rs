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

//! Grouping of faces into renderable triangle batches.
//!
//! The faces of a model are sorted by texture and cut into batches that share one texture and hold
//! at most a fixed number of faces. Every batch packs the lightmaps of its faces into its own
//! atlas, so that a batch can be drawn with exactly one albedo texture and one lightmap texture
//! bound.

use std::collections::HashMap;

use crate::{
    common::bsp::BspData,
    render::{
        face::{self, ResolvedFace},
        image::Image,
        lightmap::{self, LightmapAtlas, Rect},
    },
};

use cgmath::Vector2;
use failure::Error;

pub const DEFAULT_MAX_FACES_PER_BATCH: usize = 100;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
    pub lightmap_texcoord: [f32; 2],
    pub color: [f32; 4],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Binds an albedo texture and a lightmap atlas for one batch.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub texture_id: usize,
    pub name: String,
    pub lightmap_id: usize,
    pub texture_filter: TextureFilter,
    pub lightmap_filter: TextureFilter,
}

#[derive(Clone, Debug)]
pub struct MeshBatch {
    pub texture_id: usize,
    /// Index into the map's materials, or `None` if the texture has no pixel data.
    pub material_id: Option<usize>,
    /// Index into the map's lightmap atlases.
    pub lightmap_id: usize,
    pub face_ids: Vec<usize>,
    /// Every rectangle allocated in the batch's atlas, starting with the fullbright texel.
    pub lightmap_rects: Vec<Rect>,
    /// Triangle list.
    pub vertices: Vec<MeshVertex>,
}

impl MeshBatch {
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Expands a convex polygon into a triangle fan around its first vertex.
///
/// Polygons with fewer than 3 vertices produce no triangles.
pub fn fan_triangulate<T>(polygon: &[T]) -> impl Iterator<Item = [T; 3]> + '_
where
    T: Copy,
{
    let first = polygon.first().copied();
    polygon
        .windows(2)
        .skip(1)
        .filter_map(move |pair| first.map(|v0| [v0, pair[0], pair[1]]))
}

fn albedo_uv(texcoord: Vector2<f32>, size: (u32, u32)) -> Vector2<f32> {
    match size {
        (0, _) | (_, 0) => texcoord,
        (w, h) => Vector2::new(texcoord.x / w as f32, texcoord.y / h as f32),
    }
}

struct PendingBatch {
    texture_id: usize,
    atlas: LightmapAtlas,
    faces: Vec<ResolvedFace>,
}

impl PendingBatch {
    fn accepts(&self, face: &ResolvedFace, max_faces: usize) -> bool {
        self.texture_id == face.texture_id && self.faces.len() < max_faces
    }

    fn add(&mut self, bsp: &BspData, mut face: ResolvedFace) {
        face.lightmap = self.atlas.allocate_face(
            bsp.lightmap_format(),
            bsp.lightmaps(),
            bsp.face(face.face_id),
            bsp.face_texinfo(face.face_id).flags,
            face.lightmap_size(),
        );
        self.faces.push(face);
    }
}

pub struct MeshBuilder<'a> {
    bsp: &'a BspData,
    textures: &'a HashMap<usize, Image>,
    max_faces_per_batch: usize,
    atlas_size: (u32, u32),

    materials: Vec<Material>,
    lightmaps: Vec<Image>,
}

impl<'a> MeshBuilder<'a> {
    pub fn new(
        bsp: &'a BspData,
        textures: &'a HashMap<usize, Image>,
        max_faces_per_batch: usize,
        atlas_size: (u32, u32),
    ) -> MeshBuilder<'a> {
        MeshBuilder {
            bsp,
            textures,
            max_faces_per_batch: max_faces_per_batch.max(1),
            atlas_size,
            materials: Vec::new(),
            lightmaps: Vec::new(),
        }
    }

    /// Builds the batches of one brush model.
    pub fn build_model(&mut self, model_id: usize) -> Result<Vec<MeshBatch>, Error> {
        let bsp = self.bsp;

        let mut faces = Vec::new();
        for (face_id, _) in bsp.model_faces(model_id)? {
            let face = face::resolve_face(bsp, face_id);
            if face.vertices.len() < 3 {
                continue;
            }
            faces.push(face);
        }

        // stable, so file order is kept within a texture
        faces.sort_by_key(|f| f.texture_id);

        let mut batches = Vec::new();
        let mut current: Option<PendingBatch> = None;
        for face in faces {
            let mut pending = match current.take() {
                Some(p) if p.accepts(&face, self.max_faces_per_batch) => p,
                Some(p) => {
                    batches.push(self.flush(p));
                    self.new_batch(face.texture_id)
                }
                None => self.new_batch(face.texture_id),
            };

            pending.add(bsp, face);
            current = Some(pending);
        }

        if let Some(p) = current {
            batches.push(self.flush(p));
        }

        debug!("Model *{}: {} batches", model_id, batches.len());
        Ok(batches)
    }

    /// Returns the materials and lightmap atlases of every batch built so far.
    pub fn finish(self) -> (Vec<Material>, Vec<Image>) {
        (self.materials, self.lightmaps)
    }

    fn new_batch(&self, texture_id: usize) -> PendingBatch {
        PendingBatch {
            texture_id,
            atlas: LightmapAtlas::new(self.atlas_size.0, self.atlas_size.1),
            faces: Vec::new(),
        }
    }

    fn flush(&mut self, pending: PendingBatch) -> MeshBatch {
        let PendingBatch {
            texture_id,
            atlas,
            faces,
        } = pending;

        // the atlas is final here, so its dimensions are valid for every face of the batch
        let atlas_size = atlas.dimensions();
        let texture_size = match self.textures.get(&texture_id) {
            Some(image) => image.dimensions(),
            None => self.bsp.textures()[texture_id].dimensions(),
        };

        let mut vertices = Vec::new();
        let mut face_ids = Vec::with_capacity(faces.len());
        for face in faces.iter() {
            face_ids.push(face.face_id);

            for tri in fan_triangulate(&face.vertices) {
                for vert in tri.iter() {
                    let lightmap_texcoord = match face.lightmap {
                        Some(ref rect) => {
                            lightmap::lightmap_uv(vert.texcoord, &face.bounds, rect, atlas_size)
                        }
                        None => lightmap::fullbright_uv(atlas_size),
                    };

                    vertices.push(MeshVertex {
                        position: vert.position.into(),
                        normal: vert.normal.into(),
                        texcoord: albedo_uv(vert.texcoord, texture_size).into(),
                        lightmap_texcoord: lightmap_texcoord.into(),
                        color: [1.0; 4],
                    });
                }
            }
        }

        let lightmap_rects = atlas.allocations().to_vec();
        let lightmap_id = self.lightmaps.len();
        self.lightmaps.push(atlas.into_image());

        let material_id = if self.textures.contains_key(&texture_id) {
            self.materials.push(Material {
                texture_id,
                name: self.bsp.textures()[texture_id].name().to_owned(),
                lightmap_id,
                texture_filter: TextureFilter::Nearest,
                lightmap_filter: TextureFilter::Linear,
            });
            Some(self.materials.len() - 1)
        } else {
            None
        };

        trace!(
            "Batch: texture {}, {} faces, {} triangles, atlas {}x{}",
            texture_id,
            face_ids.len(),
            vertices.len() / 3,
            atlas_size.0,
            atlas_size.1
        );

        MeshBatch {
            texture_id,
            material_id,
            lightmap_id,
            face_ids,
            lightmap_rects,
            vertices,
        }
    }
}
