use super::{Pipeline, ResizeError, Resizer, media_box};
use crate::filesystem::File;
use crate::format::FormatSettings;
use crate::imaging::{Dimensions, ImageBackend, Mode, compute_target_box};
use crate::media::Media;
use crate::metadata::MetadataBuilder;
use std::sync::Arc;

/// Scales the whole image into (inset) or over (outbound) the format box.
pub struct SimpleResizer {
    pipeline: Pipeline,
    mode: Mode,
}

impl SimpleResizer {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        metadata: Arc<dyn MetadataBuilder>,
        mode: Mode,
    ) -> Self {
        Self {
            pipeline: Pipeline { backend, metadata },
            mode,
        }
    }
}

impl Resizer for SimpleResizer {
    fn resize(
        &self,
        media: &Media,
        input: &File,
        output: &File,
        format: &str,
        settings: &FormatSettings,
    ) -> Result<(), ResizeError> {
        let target = self.get_box(media, settings)?;
        let image = self.pipeline.load(input)?;
        // An inset target is already fitted; refitting it would round a side down.
        let resized = match self.mode {
            Mode::Inset => image.resize(target)?,
            Mode::Outbound => image.thumbnail(target, Mode::Outbound)?,
        };
        self.pipeline
            .write(media, resized.as_ref(), output, format, settings)
    }

    fn get_box(&self, media: &Media, settings: &FormatSettings) -> Result<Dimensions, ResizeError> {
        let source = media_box(media)?;
        Ok(compute_target_box(
            source,
            settings.width,
            settings.height,
            self.mode,
        )?)
    }
}
