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

pub mod map;

use cgmath::Vector3;
use nom::{bytes::complete::tag, bytes::complete::take_while, sequence::delimited};

pub use self::map::entities;

fn string_contents(input: &str) -> nom::IResult<&str, &str> {
    take_while(|c: char| c != '"' && c != '\n' && c != '\r')(input)
}

pub fn quoted(input: &str) -> nom::IResult<&str, &str> {
    delimited(tag("\""), string_contents, tag("\""))(input)
}

pub fn vector3_components<S>(src: S) -> Option<[f32; 3]>
where
    S: AsRef<str>,
{
    let components: Vec<_> = src.as_ref().split_whitespace().collect();
    if components.len() != 3 {
        return None;
    }

    let mut out = [0.0; 3];
    for (o, c) in out.iter_mut().zip(components) {
        *o = c.parse().ok()?;
    }

    Some(out)
}

pub fn vector3<S>(src: S) -> Option<Vector3<f32>>
where
    S: AsRef<str>,
{
    vector3_components(src).map(Vector3::from)
}
