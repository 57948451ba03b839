use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};

/// The raw name or URL typed by the user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphReference(String);

/// What a reference points at, decided once per resolution
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceKind {
    Url(Url),
    LocalPath(PathBuf),
    Name(String),
}

impl GraphReference {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kind(&self) -> ReferenceKind {
        let raw = self.0.as_str();
        if Path::new(raw).is_absolute() {
            return ReferenceKind::LocalPath(PathBuf::from(raw));
        }
        match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => ReferenceKind::Url(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => ReferenceKind::LocalPath(path),
                Err(()) => ReferenceKind::Name(raw.to_string()),
            },
            _ => ReferenceKind::Name(raw.to_string()),
        }
    }
}

impl fmt::Display for GraphReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GraphReference {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for GraphReference {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Remote(Url),
    Local(PathBuf),
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Remote(url) => write!(f, "{}", url),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A verified-reachable location, valid only for the reference it came from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocator {
    reference: GraphReference,
    location: Location,
}

impl ResolvedLocator {
    pub fn new(reference: GraphReference, location: Location) -> Self {
        Self {
            reference,
            location,
        }
    }

    pub fn reference(&self) -> &GraphReference {
        &self.reference
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// False as soon as the user edits the reference
    pub fn is_for(&self, reference: &GraphReference) -> bool {
        &self.reference == reference
    }

    pub fn url(&self) -> Option<&Url> {
        match &self.location {
            Location::Remote(url) => Some(url),
            Location::Local(_) => None,
        }
    }
}

impl fmt::Display for ResolvedLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}

/// Sub-graph definition bytes persisted on disk
#[derive(Debug, Clone, PartialEq)]
pub struct LocalArtifact {
    pub path: PathBuf,
    pub locator: ResolvedLocator,
}
