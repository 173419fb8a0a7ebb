//! Image sources addressed by record identifier.

use crate::image::OwnedImage;
use crate::util::{PrintMatchError, PrintMatchResult};
use std::collections::HashMap;
#[cfg(feature = "image-io")]
use std::path::{Path, PathBuf};

/// Resolves a record identifier to a decoded grayscale image.
///
/// Implementations report a missing record as [`PrintMatchError::NotFound`]
/// and an unreadable one as [`PrintMatchError::Decode`].
pub trait ImageLoader: Sync {
    fn load(&self, id: &str) -> PrintMatchResult<OwnedImage>;
}

impl<F> ImageLoader for F
where
    F: Fn(&str) -> PrintMatchResult<OwnedImage> + Sync,
{
    fn load(&self, id: &str) -> PrintMatchResult<OwnedImage> {
        self(id)
    }
}

/// Identifiers `prefix1` through `prefix{count}`.
pub fn sequential_ids(prefix: &str, count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("{prefix}{i}")).collect()
}

#[derive(Clone, Debug)]
enum Entry {
    Image(OwnedImage),
    Undecodable(String),
}

/// In-memory loader, mostly for tests and embedding.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    entries: HashMap<String, Entry>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `image` under `id`, replacing any previous entry.
    pub fn insert(&mut self, id: impl Into<String>, image: OwnedImage) {
        self.entries.insert(id.into(), Entry::Image(image));
    }

    /// Registers `id` as present but undecodable.
    pub fn insert_undecodable(&mut self, id: impl Into<String>, reason: impl Into<String>) {
        self.entries.insert(id.into(), Entry::Undecodable(reason.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ImageLoader for MemoryLoader {
    fn load(&self, id: &str) -> PrintMatchResult<OwnedImage> {
        match self.entries.get(id) {
            Some(Entry::Image(img)) => Ok(img.clone()),
            Some(Entry::Undecodable(reason)) => Err(PrintMatchError::Decode {
                id: id.to_string(),
                reason: reason.clone(),
            }),
            None => Err(PrintMatchError::NotFound {
                id: id.to_string(),
                tried: 1,
            }),
        }
    }
}

/// File extensions probed, in order, for identifiers without one.
pub const DEFAULT_EXTENSIONS: [&str; 4] = ["png", "bmp", "jpg", "jpeg"];

/// Loads records from a directory, probing known image extensions.
///
/// An identifier that already ends in a known extension is opened directly.
/// Otherwise `id.png`, `id.bmp`, `id.jpg` and `id.jpeg` are tried in order
/// and the first file that decodes wins.
#[cfg(feature = "image-io")]
#[derive(Clone, Debug)]
pub struct DirectoryLoader {
    base: PathBuf,
    extensions: Vec<String>,
}

#[cfg(feature = "image-io")]
impl DirectoryLoader {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Replaces the probed extensions (without leading dots).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn has_known_extension(&self, id: &str) -> bool {
        Path::new(id)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|k| k.eq_ignore_ascii_case(ext)))
    }
}

#[cfg(feature = "image-io")]
impl ImageLoader for DirectoryLoader {
    fn load(&self, id: &str) -> PrintMatchResult<OwnedImage> {
        use crate::image::io::load_gray_image;

        if self.has_known_extension(id) {
            return load_gray_image(self.base.join(id)).map_err(|err| relabel(err, id));
        }

        let mut tried = 0;
        let mut decode_error = None;
        for ext in &self.extensions {
            let path = self.base.join(format!("{id}.{ext}"));
            tried += 1;
            if !path.is_file() {
                continue;
            }
            match load_gray_image(&path) {
                Ok(img) => return Ok(img),
                Err(err) => decode_error = Some(err),
            }
        }
        match decode_error {
            Some(err) => Err(relabel(err, id)),
            None => Err(PrintMatchError::NotFound {
                id: id.to_string(),
                tried,
            }),
        }
    }
}

/// Reports load errors under the record identifier rather than the path.
#[cfg(feature = "image-io")]
fn relabel(err: PrintMatchError, id: &str) -> PrintMatchError {
    match err {
        PrintMatchError::NotFound { tried, .. } => PrintMatchError::NotFound {
            id: id.to_string(),
            tried,
        },
        PrintMatchError::Decode { reason, .. } => PrintMatchError::Decode {
            id: id.to_string(),
            reason,
        },
        other => other,
    }
}
