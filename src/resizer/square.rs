use super::{Pipeline, ResizeError, Resizer, media_box, missing_setting};
use crate::filesystem::File;
use crate::format::FormatSettings;
use crate::imaging::{Dimensions, ImageBackend, Mode, Point};
use crate::media::Media;
use crate::metadata::MetadataBuilder;
use std::sync::Arc;

/// Crops to a centered square when the format has a height, then shrinks
/// to the format width. Never upscales.
pub struct SquareResizer {
    pipeline: Pipeline,
    mode: Mode,
}

impl SquareResizer {
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

/// Square crop of a non-square source: offset and side.
///
/// Landscape sources are cut at the horizontal center; portrait sources
/// keep their top.
fn square_crop(size: Dimensions) -> Option<(Point, Dimensions)> {
    let lower = size.width.min(size.height);
    let higher = size.width.max(size.height);
    let crop = higher - lower;
    if crop == 0 {
        return None;
    }
    let start = if higher == size.height {
        Point::new(0, 0)
    } else {
        Point::new(crop / 2, 0)
    };
    Some((start, Dimensions::new(lower, lower)))
}

/// Target box when strictly smaller than `size` on both axes.
fn shrunk(width: u32, size: Dimensions) -> Option<Dimensions> {
    let height = (u64::from(width) * u64::from(size.height) / u64::from(size.width)) as u32;
    (width < size.width && height < size.height).then(|| Dimensions::new(width, height))
}

impl Resizer for SquareResizer {
    fn resize(
        &self,
        media: &Media,
        input: &File,
        output: &File,
        format: &str,
        settings: &FormatSettings,
    ) -> Result<(), ResizeError> {
        let width = settings.width.ok_or_else(|| missing_setting(media, "Width"))?;
        media_box(media)?;

        let mut image = self.pipeline.load(input)?;
        let mut size = image.size();
        if settings.height.is_some()
            && let Some((start, square)) = square_crop(size)
        {
            image = image.crop(start, square)?;
            size = image.size();
        }

        if let Some(target) = shrunk(width, size) {
            image = match self.mode {
                Mode::Inset => image.resize(target)?,
                Mode::Outbound => image.thumbnail(target, Mode::Outbound)?,
            };
        }
        self.pipeline
            .write(media, image.as_ref(), output, format, settings)
    }

    fn get_box(&self, media: &Media, settings: &FormatSettings) -> Result<Dimensions, ResizeError> {
        let width = settings.width.ok_or_else(|| missing_setting(media, "Width"))?;
        let size = media_box(media)?;

        if settings.height.is_some()
            && let Some((_, square)) = square_crop(size)
        {
            return Ok(square);
        }
        Ok(shrunk(width, size).unwrap_or(size))
    }
}
