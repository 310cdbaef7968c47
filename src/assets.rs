//! Public URLs for local files referenced by documents.
//!
//! Nothing here touches the file system. [`LocalAssets`] only records which files have to be
//! copied where, and the caller performs the copies.

use std::{
    collections::HashMap,
    fmt,
    path::Path,
    sync::{Arc, Mutex},
};

use crate::{media::AssetResolver, url};

/// Where copied files go, relative to the output directory.
#[derive(Clone)]
pub enum DestinationDir {
    /// Files go to `<dir>/<hash>/<name>.<ext>`.
    Dir(String),
    /// Files go to `<f(name, hash)>.<ext>`.
    Func(Arc<dyn Fn(&str, &str) -> String + Send + Sync>),
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error(
        "Invalid destination directory, it must be a child of the output directory but was: {0}"
    )]
    InvalidDestinationDir(String),
}

#[derive(Debug, Clone, Default)]
pub struct AssetOptions {
    pub destination_dir: Option<DestinationDir>,
}

/// A local file that documents may link to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: String,
    /// Digest of the file's contents.
    pub digest: String,
}

/// A file that has to be copied for the output to be complete.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PlannedCopy {
    pub source: String,
    pub destination: String,
}

/// Resolves URLs relative to a document against a set of known local files.
#[derive(Debug)]
pub struct LocalAssets {
    document_dir: String,
    files: HashMap<String, LocalFile>,
    options: AssetOptions,
    path_prefix: String,
    copies: Mutex<Vec<PlannedCopy>>,
}

impl DestinationDir {
    /// Parses a destination such as `static` or `static/{hash}-{name}`.
    pub fn template(template: &str) -> Self {
        if template.contains("{name}") || template.contains("{hash}") {
            let template = template.to_owned();
            Self::Func(Arc::new(move |name, hash| {
                template.replace("{name}", name).replace("{hash}", hash)
            }))
        } else {
            Self::Dir(template.to_owned())
        }
    }
}

impl fmt::Debug for DestinationDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dir(dir) => f.debug_tuple("Dir").field(dir).finish(),
            Self::Func(func) => f.debug_tuple("Func").field(&func("n", "h")).finish(),
        }
    }
}

impl AssetOptions {
    /// Fails if files could be copied outside of the output directory.
    pub fn validate(&self) -> Result<(), AssetError> {
        let (sample, shown) = match &self.destination_dir {
            None => return Ok(()),
            Some(DestinationDir::Dir(dir)) => (format!("{dir}/h/n"), dir.clone()),
            Some(DestinationDir::Func(func)) => {
                let sample = func("n", "h");
                (sample.clone(), sample)
            }
        };
        if escapes_root(&sample) {
            return Err(AssetError::InvalidDestinationDir(shown));
        }
        Ok(())
    }

    /// The destination of `file`, relative to the output directory.
    pub fn destination(&self, file: &LocalFile) -> String {
        let path = Path::new(&file.path);
        let name = path.file_stem().unwrap_or_default().to_string_lossy();
        let extension = path.extension().unwrap_or_default().to_string_lossy();
        let default = format!("{}/{name}.{extension}", file.digest);
        match &self.destination_dir {
            None => default,
            Some(DestinationDir::Dir(dir)) => format!("{dir}/{default}"),
            Some(DestinationDir::Func(func)) => format!("{}.{extension}", func(&name, &file.digest)),
        }
    }
}

impl LocalAssets {
    /// `document_path` is the path of the document whose relative URLs are resolved.
    pub fn new(
        document_path: &str,
        options: AssetOptions,
        path_prefix: impl Into<String>,
    ) -> Result<Self, AssetError> {
        options.validate()?;
        let document_dir = match document_path.rsplit_once('/') {
            Some((dir, _)) => dir.to_owned(),
            None => String::new(),
        };
        Ok(Self {
            document_dir,
            files: HashMap::new(),
            options,
            path_prefix: path_prefix.into(),
            copies: Mutex::new(Vec::new()),
        })
    }

    pub fn file(mut self, path: impl Into<String>, digest: impl Into<String>) -> Self {
        let path = path.into();
        let file = LocalFile {
            path: normalize(&path),
            digest: digest.into(),
        };
        self.files.insert(file.path.clone(), file);
        self
    }

    /// Files that were linked from documents so far, in the order they were first linked.
    pub fn planned_copies(&self) -> Vec<PlannedCopy> {
        match self.copies.lock() {
            Ok(copies) => copies.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AssetResolver for LocalAssets {
    fn public_url(&self, src: &str) -> Option<String> {
        if url::is_absolute(src) {
            return None;
        }
        let path = src.split(['?', '#']).next().unwrap_or_default();
        let file = self.files.get(&normalize(&format!("{}/{path}", self.document_dir)))?;

        let destination = self.options.destination(file);
        let copy = PlannedCopy {
            source: file.path.clone(),
            destination: destination.clone(),
        };
        let mut copies = match self.copies.lock() {
            Ok(copies) => copies,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !copies.contains(&copy) {
            log::debug!("Planning to copy {} to {}", copy.source, copy.destination);
            copies.push(copy);
        }

        Some(normalize(&format!("/{}/{destination}", self.path_prefix)))
    }
}

/// Resolves `.` and `..` segments and repeated slashes of a `/`-separated path.
fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." if segments.last().is_some_and(|last| *last != "..") => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }
    let normalized = segments.join("/");
    if path.starts_with('/') {
        format!("/{normalized}")
    } else {
        normalized
    }
}

fn escapes_root(path: &str) -> bool {
    path.starts_with('/') || normalize(path).split('/').next() == Some("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(dir: &str) -> AssetOptions {
        AssetOptions {
            destination_dir: Some(DestinationDir::template(dir)),
        }
    }

    #[test]
    fn destinations_must_stay_inside_output() {
        assert!(AssetOptions::default().validate().is_ok());
        assert!(options("static").validate().is_ok());
        assert!(options("a/../b").validate().is_ok());
        assert!(options("{hash}/{name}").validate().is_ok());
        for invalid in ["..", "../static", "a/../../b", "/var/www", "../{name}"] {
            let err = options(invalid).validate().unwrap_err();
            assert!(err.to_string().starts_with("Invalid destination directory"));
        }
    }

    #[test]
    fn destinations() {
        let file = LocalFile {
            path: "posts/horse.png".into(),
            digest: "abc123".into(),
        };
        assert_eq!(AssetOptions::default().destination(&file), "abc123/horse.png");
        assert_eq!(options("static").destination(&file), "static/abc123/horse.png");
        assert_eq!(options("media/{name}-{hash}").destination(&file), "media/horse-abc123.png");
    }

    #[test]
    fn local_files_get_public_urls() {
        let assets = LocalAssets::new("content/posts/a.xml", options("static"), "blog")
            .unwrap()
            .file("content/images/horse.png", "d1g3st");
        assert_eq!(
            assets.public_url("../images/horse.png?width=100").as_deref(),
            Some("/blog/static/d1g3st/horse.png")
        );
        assert_eq!(assets.public_url("../images/horse.png#top").as_deref(), Some("/blog/static/d1g3st/horse.png"));
        assert_eq!(assets.public_url("missing.png"), None);
        assert_eq!(assets.public_url("https://example.com/horse.png"), None);
        assert_eq!(
            assets.planned_copies(),
            [PlannedCopy {
                source: "content/images/horse.png".into(),
                destination: "static/d1g3st/horse.png".into(),
            }]
        );
    }

    #[test]
    fn invalid_destination_is_rejected() {
        assert!(LocalAssets::new("a.xml", options("../out"), "").is_err());
    }
}
