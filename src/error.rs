use std::{
    error::Error,
    fmt::{Display, Formatter},
};

/// Configuration error: an input raster's shape disagrees with the frame's
/// source shape. Fatal, aborts the frame before any stage runs.
#[derive(Debug, Clone)]
pub struct SdcaError {
    pub name: &'static str,
    pub expected: (usize, usize),
    pub found: (usize, usize),
}

impl Display for SdcaError {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "raster '{}' has shape {:?}, expected {:?}",
            self.name, self.found, self.expected
        )
    }
}

impl Error for SdcaError {}

pub type SdcaResult<T> = Result<T, SdcaError>;
