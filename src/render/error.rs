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

use std::{
    convert::From,
    fmt::{self, Display},
    io,
};

use failure::{Backtrace, Context, Error, Fail};

#[derive(Debug)]
pub struct LoadError {
    inner: Context<LoadErrorKind>,
}

impl LoadError {
    pub fn kind(&self) -> LoadErrorKind {
        *self.inner.get_context()
    }
}

impl From<LoadErrorKind> for LoadError {
    fn from(kind: LoadErrorKind) -> Self {
        LoadError {
            inner: Context::new(kind),
        }
    }
}

impl From<Context<LoadErrorKind>> for LoadError {
    fn from(inner: Context<LoadErrorKind>) -> Self {
        LoadError { inner }
    }
}

impl From<io::Error> for LoadError {
    fn from(io_error: io::Error) -> Self {
        io_error.context(LoadErrorKind::Io).into()
    }
}

impl From<Error> for LoadError {
    fn from(error: Error) -> Self {
        error.context(LoadErrorKind::Malformed).into()
    }
}

impl Fail for LoadError {
    fn cause(&self) -> Option<&dyn Fail> {
        self.inner.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.inner.backtrace()
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(&self.inner, f)
    }
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Fail)]
pub enum LoadErrorKind {
    #[fail(display = "Failed to read map file")]
    Io,
    #[fail(display = "Malformed map file")]
    Malformed,
}
