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
extern crate docopt;
extern crate env_logger;
extern crate log;
extern crate png;
extern crate serde;
#[macro_use]
extern crate serde_derive;

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    process::exit,
};

use bspview::{
    common::palette::Palette,
    render::{BspView, Image, LoadOptions, LoadedMap},
};

use docopt::Docopt;
use log::LevelFilter;

#[derive(Deserialize)]
struct Args {
    arg_bsp: String,
    flag_palette: Option<String>,
    flag_wad_dir: Vec<String>,
    flag_batch: usize,
    flag_world_only: bool,
    flag_dump_lightmaps: Option<String>,
    flag_verbose: bool,
    flag_version: bool,
}

const USAGE: &'static str = "
Usage: bsp-mesh [options] [--wad-dir=<dir>]... <bsp>
       bsp-mesh (-h | --help)
       bsp-mesh --version

Options:
    -p, --palette <lmp>         Palette for textures without their own (gfx/palette.lmp).
    -w, --wad-dir <dir>         Search <dir> for WAD files before the map's own directory.
    -b, --batch <n>             Maximum number of faces per batch [default: 100].
        --world-only            Skip brush entity models.
        --dump-lightmaps <dir>  Write every lightmap atlas to <dir> as a PNG image.
    -v, --verbose               Produce detailed output.

    -h, --help                  Show this message and exit.
        --version               Print version information and exit.
";

const VERSION: &'static str = "
bsp-mesh 0.1
Copyright © 2018 Cormac O'Brien
Released under the terms of the MIT License
";

fn write_png<P>(path: P, image: &Image) -> Result<(), png::EncodingError>
where
    P: AsRef<Path>,
{
    image.write_png(BufWriter::new(File::create(path)?))
}

fn print_summary(map: &LoadedMap) {
    println!("BSP version:  {:?}", map.version);
    println!("Entities:     {}", map.entities.len());
    println!("Textures:     {}", map.textures.len());
    println!("Materials:    {}", map.materials.len());
    println!("Lightmaps:    {}", map.lightmaps.len());

    for model in map.models.iter() {
        println!(
            "*{:<4} {:>4} batches {:>7} triangles  origin ({}, {}, {})",
            model.model_id,
            model.batches.len(),
            model.triangle_count(),
            model.origin.x,
            model.origin.y,
            model.origin.z
        );
    }

    println!(
        "Total:        {} batches, {} triangles",
        map.batch_count(),
        map.triangle_count()
    );
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if args.flag_version {
        println!("{}", VERSION);
        exit(0);
    }

    let mut logger = env_logger::Builder::from_default_env();
    if args.flag_verbose {
        logger.filter_module("bspview", LevelFilter::Debug);
    }
    logger.init();

    let palette = match args.flag_palette {
        Some(ref p) => match File::open(p).map_err(From::from).and_then(Palette::load) {
            Ok(palette) => Some(palette),
            Err(why) => {
                println!("Couldn't load palette {}: {}", p, why);
                exit(1);
            }
        },
        None => None,
    };

    let options = LoadOptions {
        palette,
        wad_dirs: args.flag_wad_dir.iter().map(PathBuf::from).collect(),
        max_faces_per_batch: args.flag_batch,
        include_brush_entities: !args.flag_world_only,
        ..LoadOptions::default()
    };

    let mut view = BspView::new(options);
    if let Err(why) = view.load_file(&args.arg_bsp) {
        println!("Couldn't load {}: {}", args.arg_bsp, why);
        exit(1);
    }

    let map = match view.map() {
        Some(m) => m,
        None => exit(1),
    };

    print_summary(map);

    if let Some(ref dir) = args.flag_dump_lightmaps {
        if let Err(why) = fs::create_dir_all(dir) {
            println!("Couldn't create {}: {}", dir, why);
            exit(1);
        }

        for (id, lightmap) in map.lightmaps.iter().enumerate() {
            let path = Path::new(dir).join(format!("lightmap{:03}.png", id));
            if let Err(why) = write_png(&path, lightmap) {
                println!("Couldn't write {}: {}", path.display(), why);
                exit(1);
            }
        }
    }
}
