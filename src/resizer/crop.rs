use super::{Pipeline, ResizeError, Resizer, media_box, missing_setting};
use crate::filesystem::File;
use crate::format::FormatSettings;
use crate::imaging::{Dimensions, ImageBackend, center_crop_offset, cover_ratio};
use crate::media::Media;
use crate::metadata::MetadataBuilder;
use std::sync::Arc;

/// Covers the exact format box and center-crops the overflow.
pub struct CropResizer {
    pipeline: Pipeline,
}

impl CropResizer {
    pub fn new(backend: Arc<dyn ImageBackend>, metadata: Arc<dyn MetadataBuilder>) -> Self {
        Self {
            pipeline: Pipeline { backend, metadata },
        }
    }

    fn target(media: &Media, settings: &FormatSettings) -> Result<Dimensions, ResizeError> {
        let width = settings.width.ok_or_else(|| missing_setting(media, "Width"))?;
        let height = settings.height.ok_or_else(|| missing_setting(media, "Height"))?;
        Ok(Dimensions::new(width, height))
    }
}

impl Resizer for CropResizer {
    fn resize(
        &self,
        media: &Media,
        input: &File,
        output: &File,
        format: &str,
        settings: &FormatSettings,
    ) -> Result<(), ResizeError> {
        let target = self.get_box(media, settings)?;
        let mut image = self.pipeline.load(input)?;
        let size = image.size();

        if !size.fits_within(target) {
            let scaled = size.scale(cover_ratio(size, target));
            image = image.resize(scaled)?;
            image = image.crop(center_crop_offset(scaled, target), target.min(scaled))?;
        }
        self.pipeline
            .write(media, image.as_ref(), output, format, settings)
    }

    fn get_box(&self, media: &Media, settings: &FormatSettings) -> Result<Dimensions, ResizeError> {
        let target = Self::target(media, settings)?;
        Ok(media_box(media)?.min(target))
    }
}
