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

//! Conversion of BSP levels into renderer-ready meshes.
//!
//! [`BspView`] owns everything produced by a load: mesh batches for the world and brush entity
//! models, decoded textures, materials and lightmap atlases. Consumers register a completion
//! callback and receive the [`LoadedMap`] once it is fully built.

pub mod error;
pub mod face;
pub mod image;
pub mod lightmap;
pub mod mesh;
pub mod texture;

use std::{
    collections::{HashMap, HashSet},
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::common::{
    bsp::{self, BspEntity, BspVersion},
    palette::Palette,
};

pub use self::{
    error::{LoadError, LoadErrorKind},
    image::{Image, ImageFormat},
    mesh::{Material, MeshBatch, MeshVertex, TextureFilter},
};

use self::{
    lightmap::{DEFAULT_ATLAS_HEIGHT, DEFAULT_ATLAS_WIDTH},
    mesh::{MeshBuilder, DEFAULT_MAX_FACES_PER_BATCH},
    texture::TextureResolver,
};

use cgmath::{Vector3, Zero as _};
use failure::Error;

#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Palette for textures that do not carry their own, usually `gfx/palette.lmp`.
    pub palette: Option<Palette>,
    /// Directories searched for the WAD files a map references, in order.
    pub wad_dirs: Vec<PathBuf>,
    pub max_faces_per_batch: usize,
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Whether to build the brush models referenced by entities in addition to the world.
    pub include_brush_entities: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            palette: None,
            wad_dirs: Vec::new(),
            max_faces_per_batch: DEFAULT_MAX_FACES_PER_BATCH,
            atlas_width: DEFAULT_ATLAS_WIDTH,
            atlas_height: DEFAULT_ATLAS_HEIGHT,
            include_brush_entities: true,
        }
    }
}

/// The batches of one brush model.
///
/// Vertex positions are in model space. `origin` and `angles` (pitch, yaw, roll in degrees) are
/// taken from the owning entity and are left for the renderer to apply.
#[derive(Clone, Debug)]
pub struct ModelMesh {
    pub model_id: usize,
    pub origin: Vector3<f32>,
    pub angles: Vector3<f32>,
    pub batches: Vec<MeshBatch>,
}

impl ModelMesh {
    pub fn triangle_count(&self) -> usize {
        self.batches.iter().map(|b| b.triangle_count()).sum()
    }
}

#[derive(Clone, Debug)]
pub struct LoadedMap {
    pub version: BspVersion,
    pub entities: Vec<BspEntity>,
    /// The world model first, followed by any brush entity models.
    pub models: Vec<ModelMesh>,
    /// RGBA8 images keyed by BSP texture index.
    pub textures: HashMap<usize, Image>,
    pub materials: Vec<Material>,
    /// RGB8 lightmap atlases, one per batch.
    pub lightmaps: Vec<Image>,
}

impl LoadedMap {
    pub fn world(&self) -> &ModelMesh {
        &self.models[0]
    }

    pub fn batch_count(&self) -> usize {
        self.models.iter().map(|m| m.batches.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.models.iter().map(|m| m.triangle_count()).sum()
    }
}

type LoadCompleted = Box<dyn FnMut(&LoadedMap)>;

pub struct BspView {
    options: LoadOptions,
    map: Option<LoadedMap>,
    load_completed: Vec<LoadCompleted>,
}

impl BspView {
    pub fn new(options: LoadOptions) -> BspView {
        BspView {
            options,
            map: None,
            load_completed: Vec::new(),
        }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut LoadOptions {
        &mut self.options
    }

    /// Returns the currently loaded map, if any.
    pub fn map(&self) -> Option<&LoadedMap> {
        self.map.as_ref()
    }

    /// Registers a callback invoked once after every successful load.
    pub fn connect_load_completed<F>(&mut self, callback: F)
    where
        F: FnMut(&LoadedMap) + 'static,
    {
        self.load_completed.push(Box::new(callback));
    }

    /// Releases the loaded map and everything it owns.
    pub fn clear(&mut self) {
        if let Some(map) = self.map.take() {
            debug!(
                "Releasing {} models, {} textures, {} lightmaps",
                map.models.len(),
                map.textures.len(),
                map.lightmaps.len()
            );
        }
    }

    /// Loads the BSP file at `path`. WAD files are also searched for next to it.
    pub fn load_file<P>(&mut self, path: P) -> Result<(), LoadError>
    where
        P: AsRef<Path>,
    {
        self.clear();

        let path = path.as_ref();
        info!("Loading {}", path.display());
        let data = fs::read(path)?;
        self.load(&data, path.parent())
    }

    /// Loads a BSP file from memory.
    ///
    /// `extra_wad_dir` is searched for WAD files after the configured directories. On failure the
    /// view is left empty.
    pub fn load(&mut self, data: &[u8], extra_wad_dir: Option<&Path>) -> Result<(), LoadError> {
        self.clear();

        let map = build_map(&self.options, data, extra_wad_dir)?;
        info!(
            "Built {} models: {} batches, {} triangles, {} textures, {} lightmaps",
            map.models.len(),
            map.batch_count(),
            map.triangle_count(),
            map.textures.len(),
            map.lightmaps.len()
        );

        for callback in self.load_completed.iter_mut() {
            callback(&map);
        }
        self.map = Some(map);

        Ok(())
    }
}

impl fmt::Debug for BspView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BspView")
            .field("options", &self.options)
            .field("map", &self.map)
            .field("load_completed", &self.load_completed.len())
            .finish()
    }
}

fn build_map(
    options: &LoadOptions,
    data: &[u8],
    extra_wad_dir: Option<&Path>,
) -> Result<LoadedMap, Error> {
    let bsp = bsp::load(data)?;
    let entities = bsp.entities()?;

    let wad_paths = entities
        .iter()
        .find(|e| e.class_name() == Some("worldspawn"))
        .map(|e| e.wad_paths())
        .unwrap_or_default();

    let mut search_dirs = options.wad_dirs.clone();
    if let Some(dir) = extra_wad_dir {
        search_dirs.push(dir.to_owned());
    }

    let mut resolver = TextureResolver::new(options.palette.as_ref());
    resolver.open_wads(&wad_paths, &search_dirs);
    let textures = resolver.resolve_all(bsp.textures());

    let mut builder = MeshBuilder::new(
        &bsp,
        &textures,
        options.max_faces_per_batch,
        (options.atlas_width, options.atlas_height),
    );

    let mut models = vec![ModelMesh {
        model_id: 0,
        origin: Vector3::zero(),
        angles: Vector3::zero(),
        batches: builder.build_model(0)?,
    }];

    if options.include_brush_entities {
        let mut built = HashSet::new();
        for entity in entities.iter() {
            let model_id = match entity.model_id() {
                Some(0) | None => continue,
                Some(id) => id,
            };

            if model_id >= bsp.models().len() {
                warn!("Entity references missing brush model *{}", model_id);
                continue;
            }

            if !built.insert(model_id) {
                continue;
            }

            models.push(ModelMesh {
                model_id,
                origin: entity.origin().unwrap_or_else(Vector3::zero),
                angles: entity.angles().unwrap_or_else(Vector3::zero),
                batches: builder.build_model(model_id)?,
            });
        }
    }

    let (materials, lightmaps) = builder.finish();

    Ok(LoadedMap {
        version: bsp.version(),
        entities,
        models,
        textures,
        materials,
        lightmaps,
    })
}
