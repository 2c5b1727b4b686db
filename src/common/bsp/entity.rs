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

use std::collections::HashMap;

use crate::common::parse;

use cgmath::Vector3;
use failure::Error;

/// A single entity from the BSP entity lump.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BspEntity {
    attributes: HashMap<String, String>,
}

impl BspEntity {
    pub(crate) fn parse_all(src: &str) -> Result<Vec<BspEntity>, Error> {
        let (rest, maps) = match parse::entities(src) {
            Ok(r) => r,
            Err(e) => bail!("Failed to parse entities: {:?}", e),
        };

        ensure!(
            rest.trim_matches(|c: char| c == '\0' || c.is_whitespace()).is_empty(),
            "Unparsed entity data: {:?}",
            rest.chars().take(32).collect::<String>()
        );

        Ok(maps
            .into_iter()
            .map(|attrs| BspEntity {
                attributes: attrs
                    .into_iter()
                    .map(|(k, v)| (k.to_owned(), v.to_owned()))
                    .collect(),
            })
            .collect())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn class_name(&self) -> Option<&str> {
        self.get("classname")
    }

    /// Returns the index of the brush model referenced by a `"model" "*N"` attribute.
    pub fn model_id(&self) -> Option<usize> {
        let model = self.get("model")?;
        if !model.starts_with('*') {
            return None;
        }

        model[1..].parse().ok()
    }

    pub fn origin(&self) -> Option<Vector3<f32>> {
        self.get("origin").and_then(parse::vector3)
    }

    /// Returns the entity's pitch/yaw/roll, falling back to the yaw-only `"angle"` attribute.
    pub fn angles(&self) -> Option<Vector3<f32>> {
        match self.get("angles") {
            Some(a) => parse::vector3(a),
            None => self
                .get("angle")
                .and_then(|a| a.trim().parse().ok())
                .map(|yaw| Vector3::new(0.0, yaw, 0.0)),
        }
    }

    /// Returns the texture library paths listed in the `"wad"` attribute, in search order.
    pub fn wad_paths(&self) -> Vec<&str> {
        match self.get("wad") {
            Some(w) => w
                .split(';')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}
