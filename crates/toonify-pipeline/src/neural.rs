//! Neural style transfer hook and its fallback bookkeeping.
//!
//! The pipeline ships no inference runtime. A front end that has one
//! implements [`NeuralStylizer`] and hands it to
//! [`Cartoonizer::with_neural`](crate::Cartoonizer::with_neural). Whether
//! the neural path can run is decided once, when the engine is built, and
//! recorded as a [`NeuralCapability`]. Requests that cannot be served fall
//! back to the Smooth variant and carry a [`Warning`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RgbImage;

/// Where the model weights are expected by default.
pub const DEFAULT_MODEL_PATH: &str = "models/animegan2.pth";

/// A neural style-transfer backend.
///
/// Implementations must return an image with the same dimensions as the
/// input; anything else is treated as a failed inference.
pub trait NeuralStylizer: Send + Sync {
    /// Stylize `image`.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] if the backend could not produce an
    /// output.
    fn stylize(&self, image: &RgbImage) -> Result<RgbImage, InferenceError>;
}

impl fmt::Debug for dyn NeuralStylizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NeuralStylizer")
    }
}

/// Failure reported by a [`NeuralStylizer`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct InferenceError(pub String);

impl InferenceError {
    /// Wrap any displayable error.
    pub fn new(reason: impl fmt::Display) -> Self {
        Self(reason.to_string())
    }
}

/// Outcome of probing for the neural backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuralCapability {
    /// Model and runtime are both present.
    Available,
    /// The model file was not found.
    ModelMissing,
    /// The model exists but no inference runtime is registered.
    RuntimeUnavailable,
}

impl NeuralCapability {
    /// Combine the two probe results. A missing model takes precedence
    /// over a missing runtime.
    #[must_use]
    pub const fn resolve(model_present: bool, runtime_present: bool) -> Self {
        match (model_present, runtime_present) {
            (false, _) => Self::ModelMissing,
            (true, false) => Self::RuntimeUnavailable,
            (true, true) => Self::Available,
        }
    }

    /// Whether neural requests can be served.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    /// The warning attached to a request this capability cannot serve.
    #[must_use]
    pub const fn warning(self) -> Option<Warning> {
        match self {
            Self::Available => None,
            Self::ModelMissing => Some(Warning::ModelMissing),
            Self::RuntimeUnavailable => Some(Warning::RuntimeUnavailable),
        }
    }
}

/// A non-fatal problem attached to a [`Cartoon`](crate::Cartoon).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    /// Neural requested, but the model file is absent.
    #[error("neural model not found, used the smooth variant instead")]
    ModelMissing,
    /// Neural requested, but no inference runtime is available.
    #[error("no neural runtime available, used the smooth variant instead")]
    RuntimeUnavailable,
    /// The stylizer ran and failed.
    #[error("neural inference failed ({0}), used the smooth variant instead")]
    InferenceFailed(String),
}

/// Run `stylizer` and check its output shape.
pub(crate) fn run(stylizer: &dyn NeuralStylizer, image: &RgbImage) -> Result<RgbImage, Warning> {
    let output = stylizer
        .stylize(image)
        .map_err(|e| Warning::InferenceFailed(e.0))?;
    if output.dimensions() == image.dimensions() {
        Ok(output)
    } else {
        let (w, h) = output.dimensions();
        Err(Warning::InferenceFailed(format!(
            "stylizer returned {w}x{h} for a {}x{} input",
            image.width(),
            image.height()
        )))
    }
}
