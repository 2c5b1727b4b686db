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

extern crate bspview;
extern crate byteorder;

use std::{cell::Cell, rc::Rc};

use bspview::{
    common::bsp::{self, BspVersion},
    render::{BspView, ImageFormat, LoadErrorKind, LoadOptions},
};

use byteorder::{LittleEndian, WriteBytesExt};

const LUMP_COUNT: usize = 15;

fn name16(name: &str) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes[..name.len()].copy_from_slice(name.as_bytes());
    bytes
}

fn floats(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.write_f32::<LittleEndian>(*v).unwrap();
    }
}

fn ints(out: &mut Vec<u8>, values: &[i32]) {
    for v in values {
        out.write_i32::<LittleEndian>(*v).unwrap();
    }
}

/// A Half-Life map holding one 32×32 square with a 2×2 embedded texture and a 3×3 RGB lightmap.
fn square_map(wad: &str) -> Vec<u8> {
    square_map_with(wad, true)
}

/// Writes the 2×2 "grass" miptex. External textures keep only the header, with zeroed offsets.
fn grass_miptex(out: &mut Vec<u8>, embedded: bool) {
    out.extend_from_slice(&name16("grass"));
    if !embedded {
        ints(out, &[2, 2, 0, 0, 0, 0]);
        return;
    }

    ints(out, &[2, 2, 40, 44, 45, 45]);
    out.extend_from_slice(&[3, 3, 3, 3, 3]);
    out.write_u16::<LittleEndian>(256).unwrap();
    for i in 0..256 {
        out.extend_from_slice(&[i as u8, 255 - i as u8, 0]);
    }
}

/// A WAD3 file holding a single 2×2 texture whose pixels all map to `color`.
fn wad3_with_texture(name: &str, color: [u8; 3]) -> Vec<u8> {
    let mut lump = Vec::new();
    lump.extend_from_slice(&name16(name));
    ints(&mut lump, &[2, 2, 40, 44, 45, 45]);
    lump.extend_from_slice(&[9, 9, 9, 9, 9]);
    lump.write_u16::<LittleEndian>(256).unwrap();
    for i in 0..256 {
        let rgb = if i == 9 { color } else { [0, 0, 0] };
        lump.extend_from_slice(&rgb);
    }

    let mut out = b"WAD3".to_vec();
    ints(&mut out, &[1, 12 + lump.len() as i32]);
    out.extend_from_slice(&lump);
    ints(&mut out, &[12, lump.len() as i32, lump.len() as i32]);
    out.extend_from_slice(&[0x43, 0, 0, 0]);
    out.extend_from_slice(&name16(name));
    out
}

fn square_map_with(wad: &str, embedded: bool) -> Vec<u8> {
    let mut lumps: Vec<Vec<u8>> = vec![Vec::new(); LUMP_COUNT];

    lumps[0] = format!(
        "{{\n\"classname\" \"worldspawn\"\n\"wad\" \"{}\"\n}}\n\0",
        wad
    )
    .into_bytes();

    floats(&mut lumps[1], &[0.0, 0.0, 1.0, 0.0]);
    ints(&mut lumps[1], &[2]);

    // texture lump: count, offset, miptex
    ints(&mut lumps[2], &[1, 8]);
    grass_miptex(&mut lumps[2], embedded);

    floats(
        &mut lumps[3],
        &[
            0.0, 0.0, 0.0, 32.0, 0.0, 0.0, 32.0, 32.0, 0.0, 0.0, 32.0, 0.0,
        ],
    );

    floats(&mut lumps[6], &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    ints(&mut lumps[6], &[0, 0]);

    let face = &mut lumps[7];
    face.write_i16::<LittleEndian>(0).unwrap();
    face.write_i16::<LittleEndian>(0).unwrap();
    face.write_i32::<LittleEndian>(0).unwrap();
    face.write_i16::<LittleEndian>(4).unwrap();
    face.write_i16::<LittleEndian>(0).unwrap();
    face.extend_from_slice(&[0, 255, 255, 255]);
    face.write_i32::<LittleEndian>(0).unwrap();

    lumps[8] = (0..27).map(|i| i as u8 * 9).collect();

    for (a, b) in [(0u16, 0u16), (0, 1), (1, 2), (2, 3), (3, 0)].iter() {
        lumps[12].write_u16::<LittleEndian>(*a).unwrap();
        lumps[12].write_u16::<LittleEndian>(*b).unwrap();
    }

    ints(&mut lumps[13], &[1, 2, 3, 4]);

    floats(&mut lumps[14], &[0.0; 9]);
    ints(&mut lumps[14], &[0, 0, 0, 0, 0, 0, 1]);

    let mut out = Vec::new();
    ints(&mut out, &[30]);
    let mut offset = 4 + 8 * LUMP_COUNT;
    for lump in lumps.iter() {
        ints(&mut out, &[offset as i32, lump.len() as i32]);
        offset += lump.len();
    }
    for lump in lumps.iter() {
        out.extend_from_slice(lump);
    }

    out
}

#[test]
fn test_parse_square_map() {
    let bsp = bsp::load(&square_map("")).unwrap();

    assert_eq!(bsp.version(), BspVersion::GoldSrc);
    assert_eq!(bsp.faces().len(), 1);
    assert_eq!(bsp.textures()[0].name(), "grass");
    assert_eq!(bsp.face_iter_vertices(0).count(), 4);

    let ents = bsp.entities().unwrap();
    assert_eq!(ents[0].class_name(), Some("worldspawn"));
}

#[test]
fn test_square_map_end_to_end() {
    let completed = Rc::new(Cell::new(0));
    let mut view = BspView::new(LoadOptions::default());
    let counter = completed.clone();
    view.connect_load_completed(move |_| counter.set(counter.get() + 1));

    view.load(&square_map(""), None).unwrap();
    assert_eq!(completed.get(), 1);

    let map = view.map().unwrap();
    let world = map.world();
    assert_eq!(world.batches.len(), 1);
    assert_eq!(world.triangle_count(), 2);

    let batch = &world.batches[0];
    assert_eq!(batch.lightmap_rects.len(), 2);
    assert_eq!(map.materials.len(), 1);

    let material = &map.materials[batch.material_id.unwrap()];
    let texture = &map.textures[&material.texture_id];
    assert_eq!(texture.dimensions(), (2, 2));
    assert_eq!(texture.format(), ImageFormat::Rgba8);
    assert_eq!(&texture.data()[..4], &[3, 252, 0, 255]);

    let lightmap = &map.lightmaps[material.lightmap_id];
    assert_eq!(lightmap.format(), ImageFormat::Rgb8);
    assert_eq!(&lightmap.data()[..3], &[255, 255, 255]);

    for vert in batch.vertices.iter() {
        for c in vert.lightmap_texcoord.iter() {
            assert!(*c >= 0.0 && *c <= 1.0, "lightmap coordinate {} out of range", c);
        }
    }

    // the patch's first sample sits right after the fullbright texel and its gutter
    let rect = batch.lightmap_rects[1];
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (3, 0, 3, 3));
    let i = rect.x as usize * 3;
    assert_eq!(&lightmap.data()[i..i + 9], &[0, 9, 18, 27, 36, 45, 54, 63, 72]);

    view.clear();
    view.clear();
    assert!(view.map().is_none());
    assert_eq!(completed.get(), 1);
}

#[test]
fn test_reject_wrong_version() {
    let mut data = square_map("");
    data[0] = 31;

    let mut view = BspView::new(LoadOptions::default());
    let err = view.load(&data, None).unwrap_err();
    assert_eq!(err.kind(), LoadErrorKind::Malformed);
    assert!(view.map().is_none());
}

#[test]
fn test_missing_wad_is_not_fatal() {
    let mut view = BspView::new(LoadOptions::default());
    view.load(&square_map("\\half-life\\valve\\nowhere.wad"), None)
        .unwrap();
    assert_eq!(view.map().unwrap().materials.len(), 1);
}

#[test]
fn test_load_file_searches_map_directory() {
    let dir = std::env::temp_dir().join(format!("bspview-map-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("square.bsp");
    std::fs::write(&path, square_map_with("c:\\valve\\square.wad", false)).unwrap();

    // without the WAD the external texture stays unresolved
    let mut view = BspView::new(LoadOptions::default());
    view.load_file(&path).unwrap();
    assert_eq!(view.map().unwrap().triangle_count(), 2);
    assert!(view.map().unwrap().materials.is_empty());

    // the drive and directories of the listed path are dropped, the map's directory is searched
    std::fs::write(dir.join("square.wad"), wad3_with_texture("GRASS", [5, 6, 7])).unwrap();
    view.load_file(&path).unwrap();

    let map = view.map().unwrap();
    assert_eq!(map.materials.len(), 1);
    let material = &map.materials[map.world().batches[0].material_id.unwrap()];
    let texture = &map.textures[&material.texture_id];
    assert_eq!(texture.dimensions(), (2, 2));
    assert_eq!(&texture.data()[..4], &[5, 6, 7, 255]);

    std::fs::remove_dir_all(&dir).unwrap();
}
