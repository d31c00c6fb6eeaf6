// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one error type every fallible operation in the crate returns.

use failure::Fail;

/// Everything that can stop a run.  None of these are retried: every
/// step is deterministic, so a retry would only fail the same way.
#[derive(Debug, Fail, Clone, PartialEq)]
pub enum MandelError {
    /// A width, height, iteration cap, worker count or pair of bounds
    /// that cannot describe a render.  Detected before any pixel is
    /// computed.
    #[fail(display = "invalid configuration: {}", _0)]
    Configuration(String),

    /// The coordinator could not reserve the full-size image buffer.
    #[fail(display = "could not allocate an image of {} elements", elements)]
    Allocation {
        /// The number of iteration counts that were requested.
        elements: usize,
    },

    /// A worker did not take part in a barrier or gather the way its
    /// peers did, or delivered a block that does not fit the partition.
    #[fail(display = "collective operation failed: {}", _0)]
    Collective(String),
}

impl MandelError {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        MandelError::Configuration(msg.into())
    }

    pub(crate) fn collective<S: Into<String>>(msg: S) -> Self {
        MandelError::Collective(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_cause() {
        let e = MandelError::config("height must be positive");
        assert_eq!(
            format!("{}", e),
            "invalid configuration: height must be positive"
        );
        let e = MandelError::Allocation { elements: 16 };
        assert_eq!(format!("{}", e), "could not allocate an image of 16 elements");
    }
}
