//! Storage path generation.
//!
//! A generator maps a media to the directory its reference file and
//! thumbnails live in. Paths are a pure function of the id and context, so
//! they never change once a media has been stored.
//!
//! | Generator | Id | Path |
//! |---|---|---|
//! | [`IdGenerator`] | `1234567` | `default/0013/35` |
//! | [`UuidGenerator`] | `a1b2c3d4-...` | `default/a1b2/c3` |
//! | [`PathGenerator`] | `/cms/media/photo` | `default/cms/media` |

use crate::media::Media;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Media has no context")]
    MissingContext,
    #[error("Media has no identifier")]
    MissingId,
    #[error("Media identifier \"{0}\" is not numeric")]
    NonNumericId(String),
    #[error("Media has no provider reference")]
    MissingReference,
}

pub trait Generator: Send + Sync {
    fn generate_path(&self, media: &Media) -> Result<String, GeneratorError>;
}

fn context(media: &Media) -> Result<&str, GeneratorError> {
    media
        .context
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or(GeneratorError::MissingContext)
}

fn id(media: &Media) -> Result<&str, GeneratorError> {
    media
        .id
        .as_ref()
        .map(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .ok_or(GeneratorError::MissingId)
}

/// Buckets integer ids into two directory levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdGenerator {
    first_level: u64,
    second_level: u64,
}

impl IdGenerator {
    pub const DEFAULT_FIRST_LEVEL: u64 = 100_000;
    pub const DEFAULT_SECOND_LEVEL: u64 = 1_000;

    /// Both levels must be non-zero.
    pub fn new(first_level: u64, second_level: u64) -> Self {
        Self {
            first_level: first_level.max(1),
            second_level: second_level.max(1),
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FIRST_LEVEL, Self::DEFAULT_SECOND_LEVEL)
    }
}

impl Generator for IdGenerator {
    fn generate_path(&self, media: &Media) -> Result<String, GeneratorError> {
        let context = context(media)?;
        let raw = id(media)?;
        let id: u64 = raw
            .parse()
            .map_err(|_| GeneratorError::NonNumericId(raw.to_string()))?;

        let first = id / self.first_level;
        let second = (id - first * self.first_level) / self.second_level;

        Ok(format!("{context}/{:04}/{:02}", first + 1, second + 1))
    }
}

/// First four and next two characters of the id.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl Generator for UuidGenerator {
    fn generate_path(&self, media: &Media) -> Result<String, GeneratorError> {
        let context = context(media)?;
        let id: Vec<char> = id(media)?.chars().collect();
        let first: String = id.iter().take(4).collect();
        let second: String = id.iter().skip(4).take(2).collect();
        Ok(format!("{context}/{first}/{second}"))
    }
}

/// The id's own parent segments.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathGenerator;

impl Generator for PathGenerator {
    fn generate_path(&self, media: &Media) -> Result<String, GeneratorError> {
        let context = context(media)?;
        let segments: Vec<&str> = id(media)?.split('/').filter(|s| !s.is_empty()).collect();
        match segments.split_last() {
            Some((_, parents)) if !parents.is_empty() => {
                Ok(format!("{context}/{}", parents.join("/")))
            }
            _ => Ok(context.to_string()),
        }
    }
}
