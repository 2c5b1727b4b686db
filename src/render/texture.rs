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

//! Conversion of BSP texture slots into RGBA images.
//!
//! Textures embedded in the BSP are decoded directly. Textures stored by name only are looked up in
//! the external WAD files listed by the map, in the order the map lists them.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    common::{
        miptex::{MipLevel, MipTexture},
        palette::Palette,
        wad::Wad,
    },
    render::image::{Image, ImageFormat},
};

/// Returns the file name component of a WAD path as written by map editors, which may use either
/// path separator.
pub fn wad_file_name(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

/// Finds a WAD file by name in the given directories, in order.
pub fn find_wad<P>(path: &str, search_dirs: &[P]) -> Option<PathBuf>
where
    P: AsRef<Path>,
{
    let file_name = wad_file_name(path);
    if file_name.is_empty() {
        return None;
    }

    search_dirs
        .iter()
        .map(|dir| dir.as_ref().join(file_name))
        .find(|candidate| candidate.is_file())
}

/// Decodes the full-size mip of a texture through a palette.
///
/// Textures without a palette of their own use `fallback`, or a grayscale ramp if there is none.
pub fn decode(texture: &MipTexture, fallback: Option<&Palette>) -> Image {
    let grayscale;
    let palette = match texture.palette().or(fallback) {
        Some(p) => p,
        None => {
            grayscale = Palette::grayscale();
            &grayscale
        }
    };

    Image::with_mipmaps(
        ImageFormat::Rgba8,
        texture.width(),
        texture.height(),
        palette.rgba(texture.mipmap(MipLevel::Full)),
    )
}

pub struct TextureResolver<'a> {
    fallback: Option<&'a Palette>,
    wads: Vec<(String, Wad)>,
}

impl<'a> TextureResolver<'a> {
    pub fn new(fallback: Option<&'a Palette>) -> TextureResolver<'a> {
        TextureResolver {
            fallback,
            wads: Vec::new(),
        }
    }

    /// Appends a WAD to the end of the search order.
    pub fn add_wad<S>(&mut self, name: S, wad: Wad)
    where
        S: Into<String>,
    {
        self.wads.push((name.into(), wad));
    }

    /// Opens each WAD named in `wad_paths`, searching `search_dirs` in order.
    ///
    /// Missing or unreadable files are logged and skipped.
    pub fn open_wads<S, P>(&mut self, wad_paths: &[S], search_dirs: &[P])
    where
        S: AsRef<str>,
        P: AsRef<Path>,
    {
        for wad_path in wad_paths {
            let wad_path = wad_path.as_ref();
            let path = match find_wad(wad_path, search_dirs) {
                Some(p) => p,
                None => {
                    warn!("WAD file {} not found", wad_path);
                    continue;
                }
            };

            match Wad::open(&path) {
                Ok(wad) => {
                    debug!("Opened {} ({} lumps)", path.display(), wad.len());
                    self.add_wad(wad_file_name(wad_path), wad);
                }
                Err(e) => warn!("Failed to open {}: {}", path.display(), e),
            }
        }
    }

    pub fn wad_count(&self) -> usize {
        self.wads.len()
    }

    /// Produces the image for one texture slot, or `None` if no pixel data can be found.
    pub fn resolve(&self, texture: &MipTexture) -> Option<Image> {
        if texture.has_pixels() {
            return Some(decode(texture, self.fallback));
        }

        let name = texture.name();
        if name.is_empty() {
            return None;
        }

        for (wad_name, wad) in self.wads.iter() {
            if !wad.contains(name) {
                continue;
            }

            match wad.open_miptex(name) {
                Ok(ref external) if external.has_pixels() => {
                    trace!("Texture {} found in {}", name, wad_name);
                    return Some(decode(external, self.fallback));
                }
                Ok(_) => debug!("Texture {} in {} has no pixel data", name, wad_name),
                Err(e) => warn!("Bad texture {} in {}: {}", name, wad_name, e),
            }
        }

        None
    }

    /// Resolves every texture slot of a map, keyed by texture index.
    pub fn resolve_all(&self, textures: &[MipTexture]) -> HashMap<usize, Image> {
        let mut images = HashMap::with_capacity(textures.len());

        for (id, texture) in textures.iter().enumerate() {
            match self.resolve(texture) {
                Some(image) => {
                    images.insert(id, image);
                }
                None if texture.name().is_empty() => (),
                None => warn!("No pixel data for texture {} ({})", id, texture.name()),
            }
        }

        images
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::common::{miptex::tests::miptex_bytes, wad::tests::wad_bytes};

    use std::io::Cursor;

    fn external(name: &str) -> MipTexture {
        let mut data = miptex_bytes(name, 4, 4, 0, None);
        data.truncate(40);
        for b in data[24..40].iter_mut() {
            *b = 0;
        }
        MipTexture::load(&data, false).unwrap()
    }

    #[test]
    fn test_wad_file_name() {
        assert_eq!(
            wad_file_name("\\sierra\\half-life\\valve\\halflife.wad"),
            "halflife.wad"
        );
        assert_eq!(wad_file_name("/usr/share/quake/gfx.wad"), "gfx.wad");
        assert_eq!(wad_file_name("decals.wad"), "decals.wad");
    }

    #[test]
    fn test_embedded_palette() {
        let data = miptex_bytes("lamp", 2, 2, 1, Some(&[0, 0, 0, 10, 20, 30]));
        let texture = MipTexture::load(&data, true).unwrap();
        let fallback = Palette::grayscale();

        let image = TextureResolver::new(Some(&fallback))
            .resolve(&texture)
            .unwrap();
        assert_eq!(image.format(), ImageFormat::Rgba8);
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(&image.data()[..4], &[10, 20, 30, 255]);
        assert_eq!(image.mip_count(), 2);
    }

    #[test]
    fn test_fallback_palette() {
        let data = miptex_bytes("lamp", 2, 2, 1, None);
        let texture = MipTexture::load(&data, false).unwrap();

        let mut rgb = vec![0u8; 768];
        rgb[3..6].copy_from_slice(&[200, 100, 0]);
        let fallback = Palette::new(&rgb).unwrap();

        let image = TextureResolver::new(Some(&fallback))
            .resolve(&texture)
            .unwrap();
        assert_eq!(&image.data()[..4], &[200, 100, 0, 255]);

        let image = TextureResolver::new(None).resolve(&texture).unwrap();
        assert_eq!(&image.data()[..4], &[1, 1, 1, 255]);
    }

    #[test]
    fn test_wad_lookup() {
        let first = wad_bytes(
            b"WAD3",
            &[("OTHER", 0x43, miptex_bytes("OTHER", 4, 4, 2, Some(&[0; 9])))],
        );
        let second = wad_bytes(
            b"WAD3",
            &[(
                "CRATE1",
                0x43,
                miptex_bytes("CRATE1", 4, 4, 2, Some(&[0, 0, 0, 0, 0, 0, 9, 8, 7])),
            )],
        );

        let mut resolver = TextureResolver::new(None);
        resolver.add_wad("first.wad", Wad::load(Cursor::new(first)).unwrap());
        resolver.add_wad("second.wad", Wad::load(Cursor::new(second)).unwrap());

        let image = resolver.resolve(&external("crate1")).unwrap();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(&image.data()[..4], &[9, 8, 7, 255]);

        assert!(resolver.resolve(&external("missing")).is_none());
    }

    #[test]
    fn test_resolve_all_skips_missing() {
        let embedded = MipTexture::load(&miptex_bytes("a", 2, 2, 0, None), false).unwrap();
        let textures = vec![embedded, MipTexture::empty(), external("b")];

        let images = TextureResolver::new(None).resolve_all(&textures);
        assert_eq!(images.len(), 1);
        assert!(images.contains_key(&0));
    }

    #[test]
    fn test_open_wads_from_disk() {
        let dir = std::env::temp_dir().join(format!("bspview-wad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let data = wad_bytes(
            b"WAD3",
            &[("STONE", 0x43, miptex_bytes("STONE", 2, 2, 0, Some(&[5, 5, 5])))],
        );
        std::fs::write(dir.join("stone.wad"), data).unwrap();

        let mut resolver = TextureResolver::new(None);
        resolver.open_wads(
            &["\\valve\\missing.wad", "c:\\valve\\stone.wad"],
            &[Path::new("/nonexistent"), dir.as_path()],
        );
        assert_eq!(resolver.wad_count(), 1);
        assert!(resolver.resolve(&external("stone")).is_some());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
