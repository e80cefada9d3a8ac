//! The long-lived cartoonization engine.

use crate::diagnostics::{
    Clock, PipelineDiagnostics, Recorder, StageId, StageMetrics, StageObserver, Untimed,
};
use crate::neural::{self, NeuralCapability, NeuralStylizer, Warning};
use crate::types::{
    Cartoon, FilterParameters, Intermediates, PipelineError, RgbImage, SourceImage, StagedResult,
    Variant,
};
use crate::variants::{self, ChainOutput};

/// Dispatches requests to the Basic, Smooth and Neural chains.
///
/// The neural capability is probed once, when the engine is built; every
/// request afterwards consults the stored result. The engine holds no
/// mutable state and can be shared across threads.
#[derive(Debug)]
pub struct Cartoonizer {
    capability: NeuralCapability,
    stylizer: Option<Box<dyn NeuralStylizer>>,
}

impl Default for Cartoonizer {
    /// An engine with no model and no runtime. Neural requests fall back
    /// with [`Warning::ModelMissing`].
    fn default() -> Self {
        Self::probe(false)
    }
}

impl Cartoonizer {
    /// An engine without an inference runtime. `model_present` is the
    /// result of the caller's check for the model file.
    #[must_use]
    pub const fn probe(model_present: bool) -> Self {
        Self {
            capability: NeuralCapability::resolve(model_present, false),
            stylizer: None,
        }
    }

    /// An engine with a registered stylizer. It is used only if
    /// `model_present` is also true.
    #[must_use]
    pub fn with_neural(model_present: bool, stylizer: Box<dyn NeuralStylizer>) -> Self {
        Self {
            capability: NeuralCapability::resolve(model_present, true),
            stylizer: Some(stylizer),
        }
    }

    /// The probed neural capability.
    #[must_use]
    pub const fn capability(&self) -> NeuralCapability {
        self.capability
    }

    /// Cartoonize an already decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameters`] if `params` fails
    /// validation and [`PipelineError::EmptyImage`] if the image has no
    /// pixels.
    pub fn cartoonize(
        &self,
        image: SourceImage,
        variant: Variant,
        params: &FilterParameters,
    ) -> Result<Cartoon, PipelineError> {
        self.cartoonize_staged(image, variant, params)
            .map(StagedResult::into_cartoon)
    }

    /// Like [`cartoonize`](Self::cartoonize), keeping every intermediate
    /// raster.
    ///
    /// # Errors
    ///
    /// Same as [`cartoonize`](Self::cartoonize).
    pub fn cartoonize_staged(
        &self,
        image: SourceImage,
        variant: Variant,
        params: &FilterParameters,
    ) -> Result<StagedResult, PipelineError> {
        self.run(image, variant, params, &mut Untimed)
    }

    /// Decode encoded image bytes and cartoonize them.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`], [`PipelineError::InputTooLarge`]
    /// or [`PipelineError::ImageDecode`] if decoding fails, and otherwise
    /// the same errors as [`cartoonize`](Self::cartoonize).
    pub fn process(
        &self,
        image_bytes: &[u8],
        variant: Variant,
        params: &FilterParameters,
    ) -> Result<Cartoon, PipelineError> {
        params.validate()?;
        let source = crate::grayscale::decode(image_bytes)?;
        self.cartoonize(source, variant, params)
    }

    /// Decode and cartoonize, timing every stage against `clock`.
    ///
    /// # Errors
    ///
    /// Same as [`process`](Self::process).
    pub fn cartoonize_with_diagnostics<C: Clock>(
        &self,
        image_bytes: &[u8],
        variant: Variant,
        params: &FilterParameters,
        clock: &C,
    ) -> Result<(StagedResult, PipelineDiagnostics), PipelineError> {
        params.validate()?;
        let start = clock.now();
        let mut recorder = Recorder::new(clock);

        let source = recorder.try_observe(
            StageId::Decode,
            || crate::grayscale::decode(image_bytes),
            |s| StageMetrics::Decode {
                input_bytes: image_bytes.len(),
                width: s.width(),
                height: s.height(),
                pixel_count: u64::from(s.width()) * u64::from(s.height()),
                channels: s.channels(),
            },
        )?;
        let staged = self.run(source, variant, params, &mut recorder)?;

        let total = clock.elapsed(&start);
        let diagnostics = crate::diagnostics::collect(&staged, recorder.into_stages(), total);
        Ok((staged, diagnostics))
    }

    fn run<O: StageObserver>(
        &self,
        source: SourceImage,
        requested: Variant,
        params: &FilterParameters,
        obs: &mut O,
    ) -> Result<StagedResult, PipelineError> {
        params.validate()?;
        if source.width() == 0 || source.height() == 0 {
            return Err(PipelineError::EmptyImage);
        }

        let source_channels = source.channels();
        let original = obs.observe(
            StageId::Normalize,
            || source.into_rgb(),
            |_| StageMetrics::Normalize { source_channels },
        );

        let mut warnings = Vec::new();
        if requested == Variant::Neural {
            match self.stylize(&original, obs) {
                Ok(output) => {
                    return Ok(StagedResult {
                        original,
                        intermediates: Intermediates::Neural,
                        output,
                        requested,
                        applied: Variant::Neural,
                        warnings,
                    });
                }
                Err(warning) => {
                    tracing::warn!(%warning, "neural variant unavailable");
                    warnings.push(warning);
                }
            }
        }

        let (applied, ChainOutput {
            intermediates,
            output,
        }) = if requested == Variant::Basic {
            (Variant::Basic, variants::basic(&original, params, obs)?)
        } else {
            (Variant::Smooth, variants::smooth(&original, params, obs)?)
        };
        tracing::debug!(%requested, %applied, "cartoonized");

        Ok(StagedResult {
            original,
            intermediates,
            output,
            requested,
            applied,
            warnings,
        })
    }

    fn stylize<O: StageObserver>(&self, image: &RgbImage, obs: &mut O) -> Result<RgbImage, Warning> {
        if let Some(warning) = self.capability.warning() {
            return Err(warning);
        }
        let Some(stylizer) = self.stylizer.as_deref() else {
            return Err(Warning::RuntimeUnavailable);
        };
        obs.observe(
            StageId::Neural,
            || neural::run(stylizer, image),
            |r| StageMetrics::Neural {
                succeeded: r.is_ok(),
            },
        )
    }
}
