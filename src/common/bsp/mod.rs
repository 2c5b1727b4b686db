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

//! Quake and Half-Life BSP file and data structure handling.
//!
//! # File Format
//!
//! The BSP file header consists only of the file format version number, stored as an `i32`. Quake
//! maps use version 29, Half-Life (GoldSrc) maps use version 30.
//!
//! This is followed by a series of "lumps" (as they are called in the Quake source code),
//! which act as a directory into the BSP file data. There are 15 of these lumps, each
//! consisting of a 32-bit offset (into the file data) and a 32-bit size (in bytes). Both versions
//! share the same lump order.
//!
//! ## Entities
//!
//! Lump 0 points to the level entity data, which is stored in a JSON-like dictionary
//! format. Entities are anonymous; they do not have names, only attributes. They are stored
//! as follows:
//!
//! ```text
//! {
//! "attribute0" "value0"
//! "attribute1" "value1"
//! }
//! ```
//!
//! The entity data is stored as a null-terminated string.
//!
//! ## Planes
//!
//! Lump 1 points to the planes, stored in point-normal form as 4 IEEE 754 single-precision floats
//! followed by a 32-bit axis type.
//!
//! ## Textures
//!
//! The textures are preceded by a 32-bit integer count and a list of 32-bit integer offsets. The
//! offsets are given in bytes from the beginning of the texture section. An offset of -1 marks a
//! missing texture. See [`crate::common::miptex`] for the texture layout itself.
//!
//! ## Faces, edges and surfedges
//!
//! Faces do not store vertices directly. Each face references a run of "surfedges", signed 32-bit
//! indices into the edge list. Each edge is a pair of 16-bit vertex indices. A positive surfedge
//! walks its edge from the first vertex, a negative one walks it backward from the second vertex,
//! so the first vertices of the run give the face polygon in winding order.
//!
//! ## Lightmaps
//!
//! Lump 8 holds the precomputed lighting as one sample per 16×16 texel block of each face. Quake
//! stores one intensity byte per sample; Half-Life stores an RGB triple.

mod entity;
pub(crate) mod load;

use std::{borrow::Cow, iter, ops::Range};

use crate::common::miptex::MipTexture;

use cgmath::{InnerSpace as _, Vector2, Vector3};
use failure::Error;

pub use self::entity::BspEntity;
pub use self::load::load;

pub const MAX_LIGHTSTYLES: usize = 4;

/// The style value marking an unused light style slot.
pub const NO_LIGHT_STYLE: u8 = 255;

#[derive(Copy, Clone, Debug, Eq, PartialEq, FromPrimitive)]
pub enum BspVersion {
    Quake = 29,
    GoldSrc = 30,
}

impl BspVersion {
    pub fn lightmap_format(self) -> LightmapFormat {
        match self {
            BspVersion::Quake => LightmapFormat::Mono,
            BspVersion::GoldSrc => LightmapFormat::Rgb,
        }
    }
}

/// The byte layout of the lightmap lump.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LightmapFormat {
    /// One intensity byte per sample.
    Mono,
    /// One RGB triple per sample.
    Rgb,
}

impl LightmapFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            LightmapFormat::Mono => 1,
            LightmapFormat::Rgb => 3,
        }
    }

    /// Returns `samples` lightmap samples starting at byte `offset` as packed RGB triples.
    ///
    /// Returns `None` if the run does not fit inside `data`.
    pub fn expand<'a>(
        self,
        data: &'a [u8],
        offset: usize,
        samples: usize,
    ) -> Option<Cow<'a, [u8]>> {
        let len = samples.checked_mul(self.bytes_per_sample())?;
        let end = offset.checked_add(len)?;
        let src = data.get(offset..end)?;

        Some(match self {
            LightmapFormat::Mono => {
                Cow::Owned(src.iter().flat_map(|&l| iter::repeat(l).take(3)).collect())
            }
            LightmapFormat::Rgb => Cow::Borrowed(src),
        })
    }
}

bitflags! {
    pub struct TexInfoFlags: u32 {
        /// Sky and liquid surfaces; no lightmap is generated for these.
        const SPECIAL = 0x1;
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BspPlane {
    pub normal: Vector3<f32>,
    pub dist: f32,
}

#[derive(Debug)]
pub struct BspTexInfo {
    pub s_vector: Vector3<f32>,
    pub s_offset: f32,
    pub t_vector: Vector3<f32>,
    pub t_offset: f32,
    pub tex_id: usize,
    pub flags: TexInfoFlags,
}

impl BspTexInfo {
    /// Projects a world-space position into unnormalized texture space.
    pub fn texcoords(&self, position: Vector3<f32>) -> Vector2<f32> {
        Vector2::new(
            self.s_vector.dot(position) + self.s_offset,
            self.t_vector.dot(position) + self.t_offset,
        )
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BspFaceSide {
    Front,
    Back,
}

#[derive(Debug)]
pub struct BspFace {
    pub plane_id: usize,
    pub side: BspFaceSide,
    pub edge_id: usize,
    pub edge_count: usize,
    pub texinfo_id: usize,
    pub light_styles: [u8; MAX_LIGHTSTYLES],
    pub lightmap_id: Option<usize>,
}

impl BspFace {
    pub fn edge_range(&self) -> Range<usize> {
        self.edge_id..self.edge_id + self.edge_count
    }
}

#[derive(Debug)]
pub struct BspEdge {
    pub vertex_ids: [u16; 2],
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BspEdgeDirection {
    Forward = 0,
    Backward = 1,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BspEdgeIndex {
    pub direction: BspEdgeDirection,
    pub index: usize,
}

impl BspEdgeIndex {
    /// Decodes a signed surfedge. Only strictly positive values walk the edge forward.
    pub fn from_surfedge(surfedge: i32) -> BspEdgeIndex {
        BspEdgeIndex {
            direction: if surfedge > 0 {
                BspEdgeDirection::Forward
            } else {
                BspEdgeDirection::Backward
            },
            index: surfedge.unsigned_abs() as usize,
        }
    }
}

#[derive(Debug)]
pub struct BspModel {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
    pub origin: Vector3<f32>,
    pub face_id: usize,
    pub face_count: usize,
}

impl BspModel {
    pub fn face_range(&self) -> Range<usize> {
        self.face_id..self.face_id + self.face_count
    }
}

#[derive(Debug)]
pub struct BspData {
    pub(crate) version: BspVersion,
    pub(crate) entities: String,
    pub(crate) planes: Box<[BspPlane]>,
    pub(crate) textures: Box<[MipTexture]>,
    pub(crate) vertices: Box<[Vector3<f32>]>,
    pub(crate) texinfo: Box<[BspTexInfo]>,
    pub(crate) faces: Box<[BspFace]>,
    pub(crate) lightmaps: Box<[u8]>,
    pub(crate) edges: Box<[BspEdge]>,
    pub(crate) edgelist: Box<[BspEdgeIndex]>,
    pub(crate) models: Box<[BspModel]>,
}

impl BspData {
    pub fn version(&self) -> BspVersion {
        self.version
    }

    pub fn lightmap_format(&self) -> LightmapFormat {
        self.version.lightmap_format()
    }

    /// Returns the raw entity lump text.
    pub fn entity_string(&self) -> &str {
        &self.entities
    }

    /// Parses the entity lump.
    pub fn entities(&self) -> Result<Vec<BspEntity>, Error> {
        BspEntity::parse_all(&self.entities)
    }

    pub fn planes(&self) -> &[BspPlane] {
        &self.planes
    }

    pub fn textures(&self) -> &[MipTexture] {
        &self.textures
    }

    pub fn vertices(&self) -> &[Vector3<f32>] {
        &self.vertices
    }

    pub fn texinfo(&self) -> &[BspTexInfo] {
        &self.texinfo
    }

    pub fn face(&self, face_id: usize) -> &BspFace {
        &self.faces[face_id]
    }

    pub fn faces(&self) -> &[BspFace] {
        &self.faces
    }

    /// Returns the vertices of a face in winding order.
    pub fn face_iter_vertices(&self, face_id: usize) -> impl Iterator<Item = Vector3<f32>> + '_ {
        let face = &self.faces[face_id];
        self.edgelist[face.edge_range()].iter().map(move |id| {
            self.vertices[self.edges[id.index].vertex_ids[id.direction as usize] as usize]
        })
    }

    pub fn face_texinfo(&self, face_id: usize) -> &BspTexInfo {
        &self.texinfo[self.faces[face_id].texinfo_id]
    }

    pub fn face_plane(&self, face_id: usize) -> &BspPlane {
        &self.planes[self.faces[face_id].plane_id]
    }

    /// Returns the outward normal of a face, taking its plane side into account.
    pub fn face_normal(&self, face_id: usize) -> Vector3<f32> {
        let normal = self.face_plane(face_id).normal;
        match self.faces[face_id].side {
            BspFaceSide::Front => normal,
            BspFaceSide::Back => -normal,
        }
    }

    pub fn lightmaps(&self) -> &[u8] {
        &self.lightmaps
    }

    pub fn edges(&self) -> &[BspEdge] {
        &self.edges
    }

    pub fn edgelist(&self) -> &[BspEdgeIndex] {
        &self.edgelist
    }

    pub fn models(&self) -> &[BspModel] {
        &self.models
    }

    /// Returns the faces belonging to a brush model, in file order, along with their indices.
    pub fn model_faces(
        &self,
        model_id: usize,
    ) -> Result<impl Iterator<Item = (usize, &BspFace)> + '_, Error> {
        let model = match self.models.get(model_id) {
            Some(m) => m,
            None => bail!("No such brush model: *{}", model_id),
        };

        let range = model.face_range();
        Ok(self.faces[range.clone()]
            .iter()
            .enumerate()
            .map(move |(i, face)| (range.start + i, face)))
    }
}
