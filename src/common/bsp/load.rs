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

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::common::{
    bsp::{
        BspData, BspEdge, BspEdgeIndex, BspFace, BspFaceSide, BspModel, BspPlane, BspTexInfo,
        BspVersion, TexInfoFlags, MAX_LIGHTSTYLES,
    },
    miptex::MipTexture,
    util,
};

use byteorder::{LittleEndian, ReadBytesExt};
use cgmath::Vector3;
use failure::{Error, ResultExt};
use num::FromPrimitive;

const MAX_TEXTURES: usize = 0x200000;

const PLANE_SIZE: usize = 20;
const TEXINFO_SIZE: usize = 40;
const FACE_SIZE: usize = 20;
const EDGE_SIZE: usize = 4;
const EDGELIST_SIZE: usize = 4;
const MODEL_SIZE: usize = 64;
const VERTEX_SIZE: usize = 12;

// the model record reserves room for 4 collision hulls
const MODEL_HEADNODES: usize = 4;

#[derive(Debug, FromPrimitive)]
enum BspLumpId {
    Entities = 0,
    Planes = 1,
    Textures = 2,
    Vertices = 3,
    Visibility = 4,
    RenderNodes = 5,
    TextureInfo = 6,
    Faces = 7,
    Lightmaps = 8,
    CollisionNodes = 9,
    Leaves = 10,
    FaceList = 11,
    Edges = 12,
    EdgeList = 13,
    Models = 14,
    Count = 15,
}

struct BspLump {
    offset: u64,
    size: usize,
}

impl BspLump {
    fn from_i32s(offset: i32, size: i32, file_len: usize) -> Result<BspLump, Error> {
        ensure!(offset >= 0, "Lump offset must not be negative (was {})", offset);
        ensure!(size >= 0, "Lump size must not be negative (was {})", size);
        ensure!(
            offset as u64 + size as u64 <= file_len as u64,
            "Lump extends past end of file (offset {}, size {}, file is {} bytes)",
            offset,
            size,
            file_len
        );

        Ok(BspLump {
            offset: offset as u64,
            size: size as usize,
        })
    }

    fn end(&self) -> u64 {
        self.offset + self.size as u64
    }

    fn count(&self, record_size: usize, name: &str) -> Result<usize, Error> {
        ensure!(self.size % record_size == 0, "Bad {} lump size", name);
        Ok(self.size / record_size)
    }
}

fn check_alignment<S>(seeker: &mut S, ofs: u64) -> Result<(), Error>
where
    S: Seek,
{
    ensure!(
        seeker.seek(SeekFrom::Current(0))? == seeker.seek(SeekFrom::Start(ofs))?,
        "BSP read misaligned"
    );

    Ok(())
}

fn read_vector3<R>(reader: &mut R) -> Result<Vector3<f32>, Error>
where
    R: ReadBytesExt,
{
    Ok(Vector3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

fn load_plane<R>(reader: &mut R) -> Result<BspPlane, Error>
where
    R: ReadBytesExt,
{
    let normal = read_vector3(reader)?;
    let dist = reader.read_f32::<LittleEndian>()?;

    // axis type, only useful for collision
    let _kind = reader.read_i32::<LittleEndian>()?;

    Ok(BspPlane { normal, dist })
}

fn load_texinfo<R>(reader: &mut R, texture_count: usize) -> Result<BspTexInfo, Error>
where
    R: ReadBytesExt,
{
    let s_vector = read_vector3(reader)?;
    let s_offset = reader.read_f32::<LittleEndian>()?;
    let t_vector = read_vector3(reader)?;
    let t_offset = reader.read_f32::<LittleEndian>()?;

    let tex_id = match reader.read_i32::<LittleEndian>()? {
        t if t < 0 || t as usize >= texture_count => bail!("Invalid texture ID ({})", t),
        t => t as usize,
    };

    let flags = TexInfoFlags::from_bits_truncate(reader.read_i32::<LittleEndian>()? as u32);

    Ok(BspTexInfo {
        s_vector,
        s_offset,
        t_vector,
        t_offset,
        tex_id,
        flags,
    })
}

fn load_textures<R>(
    reader: &mut R,
    data: &[u8],
    tex_lump: &BspLump,
    version: BspVersion,
) -> Result<Vec<MipTexture>, Error>
where
    R: ReadBytesExt + Seek,
{
    // a map without textures may leave the lump empty
    if tex_lump.size == 0 {
        return Ok(Vec::new());
    }

    reader.seek(SeekFrom::Start(tex_lump.offset))?;
    let tex_count = reader.read_i32::<LittleEndian>()?;
    ensure!(
        tex_count >= 0 && tex_count as usize <= MAX_TEXTURES,
        "Invalid texture count"
    );
    let tex_count = tex_count as usize;

    let mut tex_offsets = Vec::with_capacity(tex_count);
    for _ in 0..tex_count {
        let ofs = reader.read_i32::<LittleEndian>()?;

        tex_offsets.push(match ofs {
            o if o < -1 => bail!("negative texture offset ({})", ofs),
            -1 => None,
            o => Some(o as usize),
        });
    }

    let lump_data = &data[tex_lump.offset as usize..tex_lump.end() as usize];
    let with_palette = version == BspVersion::GoldSrc;

    let mut textures = Vec::with_capacity(tex_count);
    for (t, tex_ofs) in tex_offsets.into_iter().enumerate() {
        let tex_ofs = match tex_ofs {
            Some(o) => o,
            None => {
                textures.push(MipTexture::empty());
                continue;
            }
        };

        ensure!(
            tex_ofs < lump_data.len(),
            "Texture {} offset out of bounds ({})",
            t,
            tex_ofs
        );

        let texture = MipTexture::load(&lump_data[tex_ofs..], with_palette)
            .with_context(|_| format!("Failed to load texture {}", t))?;

        debug!(
            "Texture {id:>width$}: {name} ({w}x{h}{embedded})",
            id = t,
            width = (tex_count as f32).log(10.0) as usize + 1,
            name = texture.name(),
            w = texture.width(),
            h = texture.height(),
            embedded = if texture.has_pixels() { "" } else { ", external" },
        );

        textures.push(texture);
    }

    Ok(textures)
}

fn load_face<R>(
    reader: &mut R,
    plane_count: usize,
    texinfo_count: usize,
    edgelist_count: usize,
) -> Result<BspFace, Error>
where
    R: ReadBytesExt,
{
    let plane_id = reader.read_i16::<LittleEndian>()?;
    if plane_id < 0 || plane_id as usize >= plane_count {
        bail!("Invalid plane id ({})", plane_id);
    }

    let side = match reader.read_i16::<LittleEndian>()? {
        0 => BspFaceSide::Front,
        1 => BspFaceSide::Back,
        s => bail!("Invalid face side ({})", s),
    };

    let edge_id = reader.read_i32::<LittleEndian>()?;
    if edge_id < 0 {
        bail!("Invalid edge ID ({})", edge_id);
    }

    let edge_count = reader.read_i16::<LittleEndian>()?;
    if edge_count < 0 {
        bail!("Invalid edge count ({})", edge_count);
    }

    if edge_id as usize + edge_count as usize > edgelist_count {
        bail!(
            "Face edges out of range ({}..{} of {})",
            edge_id,
            edge_id as usize + edge_count as usize,
            edgelist_count
        );
    }

    let texinfo_id = reader.read_i16::<LittleEndian>()?;
    if texinfo_id < 0 || texinfo_id as usize >= texinfo_count {
        bail!("Invalid texinfo ID ({})", texinfo_id);
    }

    let mut light_styles = [0; MAX_LIGHTSTYLES];
    for style in light_styles.iter_mut() {
        *style = reader.read_u8()?;
    }

    // anything negative means the face has no lightmap
    let lightmap_id = match reader.read_i32::<LittleEndian>()? {
        o if o < 0 => None,
        o => Some(o as usize),
    };

    Ok(BspFace {
        plane_id: plane_id as usize,
        side,
        edge_id: edge_id as usize,
        edge_count: edge_count as usize,
        texinfo_id: texinfo_id as usize,
        light_styles,
        lightmap_id,
    })
}

fn load_model<R>(reader: &mut R, face_count: usize) -> Result<BspModel, Error>
where
    R: ReadBytesExt,
{
    let min = read_vector3(reader)?;
    let max = read_vector3(reader)?;
    let origin = read_vector3(reader)?;

    // collision hull roots and vis leaf count are not needed for rendering
    for _ in 0..MODEL_HEADNODES + 1 {
        reader.read_i32::<LittleEndian>()?;
    }

    let face_id = match reader.read_i32::<LittleEndian>()? {
        x if x < 0 => bail!("Invalid face id ({})", x),
        x => x as usize,
    };

    let model_face_count = match reader.read_i32::<LittleEndian>()? {
        x if x < 0 => bail!("Invalid face count ({})", x),
        x => x as usize,
    };

    ensure!(
        face_id + model_face_count <= face_count,
        "Model faces out of range ({}..{} of {})",
        face_id,
        face_id + model_face_count,
        face_count
    );

    Ok(BspModel {
        min,
        max,
        origin,
        face_id,
        face_count: model_face_count,
    })
}

/// Load a BSP file of either supported version.
///
/// Every cross-reference between lumps is validated, so indices stored in the returned
/// [`BspData`] are always in range.
pub fn load(data: &[u8]) -> Result<BspData, Error> {
    let mut reader = Cursor::new(data);

    let version_id = reader.read_i32::<LittleEndian>()?;
    let version = match BspVersion::from_i32(version_id) {
        Some(v) => v,
        None => bail!("Bad version number (found {}, should be 29 or 30)", version_id),
    };
    debug!("BSP version {:?}", version);

    let mut lumps = Vec::with_capacity(BspLumpId::Count as usize);
    for l in 0..(BspLumpId::Count as usize) {
        let offset = reader.read_i32::<LittleEndian>()?;
        let size = reader.read_i32::<LittleEndian>()?;

        debug!(
            "{: <16} Offset = 0x{:>08x} | Size = 0x{:>08x}",
            format!("{:?}:", BspLumpId::from_usize(l)),
            offset,
            size
        );

        lumps.push(BspLump::from_i32s(offset, size, data.len()).context("Failed to read lump")?);
    }

    let ent_lump = &lumps[BspLumpId::Entities as usize];
    let plane_lump = &lumps[BspLumpId::Planes as usize];
    let tex_lump = &lumps[BspLumpId::Textures as usize];
    let vert_lump = &lumps[BspLumpId::Vertices as usize];
    let texinfo_lump = &lumps[BspLumpId::TextureInfo as usize];
    let face_lump = &lumps[BspLumpId::Faces as usize];
    let lightmap_lump = &lumps[BspLumpId::Lightmaps as usize];
    let edge_lump = &lumps[BspLumpId::Edges as usize];
    let edgelist_lump = &lumps[BspLumpId::EdgeList as usize];
    let model_lump = &lumps[BspLumpId::Models as usize];

    // check that lump sizes make sense for their types
    let plane_count = plane_lump.count(PLANE_SIZE, "plane")?;
    let vert_count = vert_lump.count(VERTEX_SIZE, "vertex")?;
    let texinfo_count = texinfo_lump.count(TEXINFO_SIZE, "texinfo")?;
    let face_count = face_lump.count(FACE_SIZE, "face")?;
    let edge_count = edge_lump.count(EDGE_SIZE, "edge")?;
    let edgelist_count = edgelist_lump.count(EDGELIST_SIZE, "edgelist")?;
    let model_count = model_lump.count(MODEL_SIZE, "model")?;

    ensure!(model_count > 0, "No brush models (need at least 1 for worldmodel)");

    reader.seek(SeekFrom::Start(ent_lump.offset))?;
    let entities = util::read_cstring(&mut (&mut reader).take(ent_lump.size as u64))?;

    // load planes
    reader.seek(SeekFrom::Start(plane_lump.offset))?;
    let mut planes = Vec::with_capacity(plane_count);
    for _ in 0..plane_count {
        planes.push(load_plane(&mut reader)?);
    }
    check_alignment(&mut reader, plane_lump.end())?;

    // load textures
    let textures = load_textures(&mut reader, data, tex_lump, version)?;

    reader.seek(SeekFrom::Start(vert_lump.offset))?;
    let mut vertices = Vec::with_capacity(vert_count);
    for _ in 0..vert_count {
        vertices.push(read_vector3(&mut reader)?);
    }
    check_alignment(&mut reader, vert_lump.end())?;

    // texinfo
    reader.seek(SeekFrom::Start(texinfo_lump.offset))?;
    let mut texinfo = Vec::with_capacity(texinfo_count);
    for i in 0..texinfo_count {
        texinfo.push(
            load_texinfo(&mut reader, textures.len())
                .with_context(|_| format!("Failed to load texinfo {}", i))?,
        );
    }
    check_alignment(&mut reader, texinfo_lump.end())?;

    reader.seek(SeekFrom::Start(face_lump.offset))?;
    let mut faces = Vec::with_capacity(face_count);
    for i in 0..face_count {
        faces.push(
            load_face(&mut reader, plane_count, texinfo_count, edgelist_count)
                .with_context(|_| format!("Failed to load face {}", i))?,
        );
    }
    check_alignment(&mut reader, face_lump.end())?;

    let lightmaps =
        data[lightmap_lump.offset as usize..lightmap_lump.end() as usize].to_vec();

    reader.seek(SeekFrom::Start(edge_lump.offset))?;
    let mut edges = Vec::with_capacity(edge_count);
    for i in 0..edge_count {
        let vertex_ids = [
            reader.read_u16::<LittleEndian>()?,
            reader.read_u16::<LittleEndian>()?,
        ];

        for id in vertex_ids.iter() {
            ensure!(
                (*id as usize) < vert_count,
                "Edge {} references invalid vertex {}",
                i,
                id
            );
        }

        edges.push(BspEdge { vertex_ids });
    }
    check_alignment(&mut reader, edge_lump.end())?;

    reader.seek(SeekFrom::Start(edgelist_lump.offset))?;
    let mut edgelist = Vec::with_capacity(edgelist_count);
    for _ in 0..edgelist_count {
        let surfedge = reader.read_i32::<LittleEndian>()?;
        let edge_index = BspEdgeIndex::from_surfedge(surfedge);
        ensure!(
            edge_index.index < edge_count,
            "Invalid edge index {}",
            surfedge
        );
        edgelist.push(edge_index);
    }
    check_alignment(&mut reader, edgelist_lump.end())?;

    reader.seek(SeekFrom::Start(model_lump.offset))?;
    let mut models = Vec::with_capacity(model_count);
    for i in 0..model_count {
        let model = load_model(&mut reader, face_count)
            .with_context(|_| format!("Failed to load model *{}", i))?;
        debug!(
            "model[{}]: faces {}..{}, origin {:?}",
            i,
            model.face_id,
            model.face_id + model.face_count,
            model.origin
        );
        models.push(model);
    }
    check_alignment(&mut reader, model_lump.end())?;

    info!(
        "Loaded {:?} BSP: {} faces, {} textures, {} models, {} bytes of lighting",
        version,
        faces.len(),
        textures.len(),
        models.len(),
        lightmaps.len()
    );

    Ok(BspData {
        version,
        entities,
        planes: planes.into_boxed_slice(),
        textures: textures.into_boxed_slice(),
        vertices: vertices.into_boxed_slice(),
        texinfo: texinfo.into_boxed_slice(),
        faces: faces.into_boxed_slice(),
        lightmaps: lightmaps.into_boxed_slice(),
        edges: edges.into_boxed_slice(),
        edgelist: edgelist.into_boxed_slice(),
        models: models.into_boxed_slice(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use crate::common::{bsp::BspEdgeDirection, miptex::tests::miptex_bytes};

    use byteorder::WriteBytesExt;

    pub(crate) struct FaceRecord {
        pub plane_id: i16,
        pub side: i16,
        pub edge_id: i32,
        pub edge_count: i16,
        pub texinfo_id: i16,
        pub styles: [u8; MAX_LIGHTSTYLES],
        pub lightmap: i32,
    }

    /// Assembles BSP files lump by lump.
    pub(crate) struct BspBuilder {
        pub version: i32,
        pub entities: String,
        pub planes: Vec<([f32; 3], f32)>,
        pub textures: Vec<Option<Vec<u8>>>,
        pub vertices: Vec<[f32; 3]>,
        pub texinfo: Vec<([f32; 4], [f32; 4], i32)>,
        /// Flags written to every texinfo record.
        pub texinfo_flags: u32,
        pub faces: Vec<FaceRecord>,
        pub lightmaps: Vec<u8>,
        pub edges: Vec<[u16; 2]>,
        pub surfedges: Vec<i32>,
        pub models: Vec<(i32, i32)>,
    }

    impl BspBuilder {
        /// A single 32×32 square on the XY plane with one 2×2 texture and a 3×3 lightmap.
        pub fn quad(version: BspVersion) -> BspBuilder {
            let palette: Vec<u8> = (0..=255u8).flat_map(|i| vec![i, i, i]).collect();
            let (texture, lightmaps) = match version {
                BspVersion::Quake => (miptex_bytes("floor", 2, 2, 7, None), vec![128; 9]),
                BspVersion::GoldSrc => (
                    miptex_bytes("floor", 2, 2, 7, Some(&palette)),
                    vec![128; 27],
                ),
            };

            BspBuilder {
                version: version as i32,
                entities: "{\n\"classname\" \"worldspawn\"\n}\n".to_owned(),
                planes: vec![([0.0, 0.0, 1.0], 0.0)],
                textures: vec![Some(texture)],
                vertices: vec![
                    [0.0, 0.0, 0.0],
                    [32.0, 0.0, 0.0],
                    [32.0, 32.0, 0.0],
                    [0.0, 32.0, 0.0],
                ],
                texinfo: vec![([1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], 0)],
                texinfo_flags: 0,
                faces: vec![FaceRecord {
                    plane_id: 0,
                    side: 0,
                    edge_id: 0,
                    edge_count: 4,
                    texinfo_id: 0,
                    styles: [0, 255, 255, 255],
                    lightmap: 0,
                }],
                lightmaps,
                edges: vec![[0, 0], [0, 1], [1, 2], [2, 3], [3, 0]],
                surfedges: vec![1, 2, 3, 4],
                models: vec![(0, 1)],
            }
        }

        pub fn build(&self) -> Vec<u8> {
            let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); BspLumpId::Count as usize];

            let mut ents = self.entities.clone().into_bytes();
            ents.push(0);
            lumps[BspLumpId::Entities as usize] = ents;

            let l = &mut lumps[BspLumpId::Planes as usize];
            for (n, d) in self.planes.iter() {
                for c in n.iter() {
                    l.write_f32::<LittleEndian>(*c).unwrap();
                }
                l.write_f32::<LittleEndian>(*d).unwrap();
                l.write_i32::<LittleEndian>(0).unwrap();
            }

            let l = &mut lumps[BspLumpId::Textures as usize];
            l.write_i32::<LittleEndian>(self.textures.len() as i32).unwrap();
            let mut ofs = 4 + 4 * self.textures.len();
            for t in self.textures.iter() {
                match t {
                    Some(bytes) => {
                        l.write_i32::<LittleEndian>(ofs as i32).unwrap();
                        ofs += bytes.len();
                    }
                    None => l.write_i32::<LittleEndian>(-1).unwrap(),
                }
            }
            for t in self.textures.iter().flatten() {
                l.extend_from_slice(t);
            }

            let l = &mut lumps[BspLumpId::Vertices as usize];
            for v in self.vertices.iter() {
                for c in v.iter() {
                    l.write_f32::<LittleEndian>(*c).unwrap();
                }
            }

            let l = &mut lumps[BspLumpId::TextureInfo as usize];
            for (s, t, tex_id) in self.texinfo.iter() {
                for c in s.iter().chain(t.iter()) {
                    l.write_f32::<LittleEndian>(*c).unwrap();
                }
                l.write_i32::<LittleEndian>(*tex_id).unwrap();
                l.write_u32::<LittleEndian>(self.texinfo_flags).unwrap();
            }

            let l = &mut lumps[BspLumpId::Faces as usize];
            for f in self.faces.iter() {
                l.write_i16::<LittleEndian>(f.plane_id).unwrap();
                l.write_i16::<LittleEndian>(f.side).unwrap();
                l.write_i32::<LittleEndian>(f.edge_id).unwrap();
                l.write_i16::<LittleEndian>(f.edge_count).unwrap();
                l.write_i16::<LittleEndian>(f.texinfo_id).unwrap();
                l.extend_from_slice(&f.styles);
                l.write_i32::<LittleEndian>(f.lightmap).unwrap();
            }

            lumps[BspLumpId::Lightmaps as usize] = self.lightmaps.clone();

            let l = &mut lumps[BspLumpId::Edges as usize];
            for e in self.edges.iter() {
                l.write_u16::<LittleEndian>(e[0]).unwrap();
                l.write_u16::<LittleEndian>(e[1]).unwrap();
            }

            let l = &mut lumps[BspLumpId::EdgeList as usize];
            for s in self.surfedges.iter() {
                l.write_i32::<LittleEndian>(*s).unwrap();
            }

            let l = &mut lumps[BspLumpId::Models as usize];
            for (face_id, face_count) in self.models.iter() {
                for _ in 0..9 {
                    l.write_f32::<LittleEndian>(0.0).unwrap();
                }
                for _ in 0..MODEL_HEADNODES + 1 {
                    l.write_i32::<LittleEndian>(0).unwrap();
                }
                l.write_i32::<LittleEndian>(*face_id).unwrap();
                l.write_i32::<LittleEndian>(*face_count).unwrap();
            }

            let header_len = 4 + 8 * BspLumpId::Count as usize;
            let mut out = Vec::new();
            out.write_i32::<LittleEndian>(self.version).unwrap();

            let mut ofs = header_len;
            for lump in lumps.iter() {
                out.write_i32::<LittleEndian>(ofs as i32).unwrap();
                out.write_i32::<LittleEndian>(lump.len() as i32).unwrap();
                ofs += lump.len();
            }
            for lump in lumps.iter() {
                out.extend_from_slice(lump);
            }

            out
        }
    }

    #[test]
    fn test_load_goldsrc_quad() {
        let bsp = load(&BspBuilder::quad(BspVersion::GoldSrc).build()).unwrap();

        assert_eq!(bsp.version(), BspVersion::GoldSrc);
        assert_eq!(bsp.faces().len(), 1);
        assert_eq!(bsp.models().len(), 1);
        assert_eq!(bsp.lightmaps().len(), 27);
        assert_eq!(bsp.textures()[0].name(), "floor");
        assert!(bsp.textures()[0].palette().is_some());
        assert_eq!(bsp.entity_string(), "{\n\"classname\" \"worldspawn\"\n}\n");

        let verts: Vec<_> = bsp.face_iter_vertices(0).collect();
        assert_eq!(
            verts,
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(32.0, 0.0, 0.0),
                Vector3::new(32.0, 32.0, 0.0),
                Vector3::new(0.0, 32.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_load_quake_quad() {
        let bsp = load(&BspBuilder::quad(BspVersion::Quake).build()).unwrap();
        assert_eq!(bsp.version(), BspVersion::Quake);
        assert_eq!(bsp.lightmaps().len(), 9);
        assert!(bsp.textures()[0].palette().is_none());
        assert!(bsp.textures()[0].has_pixels());
    }

    #[test]
    fn test_negative_surfedges_walk_backward() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.edges = vec![[0, 0], [1, 0], [2, 1], [3, 2], [0, 3]];
        builder.surfedges = vec![-1, -2, -3, -4];
        let bsp = load(&builder.build()).unwrap();

        assert_eq!(bsp.edgelist()[0].direction, BspEdgeDirection::Backward);
        let verts: Vec<_> = bsp.face_iter_vertices(0).collect();
        assert_eq!(verts[0], Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(verts[1], Vector3::new(32.0, 0.0, 0.0));
        assert_eq!(verts[3], Vector3::new(0.0, 32.0, 0.0));
    }

    #[test]
    fn test_missing_texture_slot() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.textures.push(None);
        let bsp = load(&builder.build()).unwrap();
        assert_eq!(bsp.textures().len(), 2);
        assert_eq!(bsp.textures()[1].dimensions(), (0, 0));
    }

    #[test]
    fn test_negative_lightmap_offset() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.faces[0].lightmap = -1;
        let bsp = load(&builder.build()).unwrap();
        assert_eq!(bsp.face(0).lightmap_id, None);
    }

    #[test]
    fn test_reject_bad_version() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.version = 31;
        assert!(load(&builder.build()).is_err());
    }

    #[test]
    fn test_reject_truncated_file() {
        let data = BspBuilder::quad(BspVersion::GoldSrc).build();
        assert!(load(&data[..data.len() - 8]).is_err());
        assert!(load(&data[..2]).is_err());
    }

    #[test]
    fn test_reject_bad_indices() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.edges[2] = [1, 9];
        assert!(load(&builder.build()).is_err());

        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.surfedges[3] = 5;
        assert!(load(&builder.build()).is_err());

        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.faces[0].edge_count = 5;
        assert!(load(&builder.build()).is_err());

        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.texinfo[0].2 = 1;
        assert!(load(&builder.build()).is_err());

        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.models[0] = (0, 2);
        assert!(load(&builder.build()).is_err());
    }

    #[test]
    fn test_reject_no_models() {
        let mut builder = BspBuilder::quad(BspVersion::GoldSrc);
        builder.models.clear();
        assert!(load(&builder.build()).is_err());
    }
}
