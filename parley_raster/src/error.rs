// Copyright 2026 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Error produced when a [`Typeface`](crate::Typeface) cannot be created.
///
/// Carries a non-exhaustive [`ErrorKind`] plus the requested collection index
/// and, for I/O failures, the underlying [`std::io::ErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The non-exhaustive category describing this error.
    kind: ErrorKind,

    /// The collection index that was requested.
    index: u32,

    /// The number of fonts in the collection, when it could be determined.
    count: Option<usize>,

    /// The I/O error category for [`ErrorKind::Io`].
    io: Option<std::io::ErrorKind>,
}

impl Error {
    /// The machine-readable category for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The collection index that was requested.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The number of fonts in the collection, if the data could be parsed that far.
    pub fn font_count(&self) -> Option<usize> {
        self.count
    }

    /// The I/O error category, for errors of kind [`ErrorKind::Io`].
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        self.io
    }

    pub(crate) fn invalid_font_data(index: u32) -> Self {
        Self {
            kind: ErrorKind::InvalidFontData,
            index,
            count: None,
            io: None,
        }
    }

    pub(crate) fn index_out_of_range(index: u32, count: usize) -> Self {
        Self {
            kind: ErrorKind::IndexOutOfRange,
            index,
            count: Some(count),
            io: None,
        }
    }

    pub(crate) fn io(index: u32, err: &std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Io,
            index,
            count: None,
            io: Some(err.kind()),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.kind {
            ErrorKind::InvalidFontData => write!(f, "data is not a supported font file"),
            ErrorKind::IndexOutOfRange => match self.count {
                Some(count) => write!(
                    f,
                    "font index {} out of range for collection of {count}",
                    self.index
                ),
                None => write!(f, "font index {} out of range", self.index),
            },
            ErrorKind::Io => match self.io {
                Some(kind) => write!(f, "failed to read font file: {kind}"),
                None => write!(f, "failed to read font file"),
            },
        }
    }
}

impl core::error::Error for Error {}

/// The non-exhaustive category of an error.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The bytes are not a font file or collection that the engine understands.
    InvalidFontData,

    /// The data is a collection, but it has no font at the requested index.
    IndexOutOfRange,

    /// The font file could not be read.
    Io,
}
