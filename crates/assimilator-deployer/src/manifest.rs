//! Per-network deployment manifest (`<deployments>/<chain id>/lp.json`).
//!
//! The manifest is a JSON object with two mappings: `assimilators`, which maps
//! contract names to deployed addresses, and `curves`, which this tool never
//! touches. The document is edited in place: every key that is already present
//! is written back unchanged and in its original order.

use {
    alloy::primitives::Address,
    serde::{Serialize, ser::Error as _},
    serde_json::{Map, Value},
    std::{
        fs,
        io::{self, Write},
        path::{Path, PathBuf},
    },
};

pub const FILE_NAME: &str = "lp.json";

const ASSIMILATORS: &str = "assimilators";
const CURVES: &str = "curves";

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("deployment directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("manifest {} is malformed: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("failed to serialize manifest {}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to access manifest {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// How the manifest is written back to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Truncate and rewrite the file in place. Concurrent writers race and the
    /// last one wins.
    #[default]
    Overwrite,
    /// Write to a temporary file next to the manifest and rename it over the
    /// target, so readers never see a half written document.
    Atomic,
}

/// Location of the manifest for the network with `chain_id`.
pub fn path(deployments_dir: &Path, chain_id: u64) -> PathBuf {
    deployments_dir.join(chain_id.to_string()).join(FILE_NAME)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    document: Map<String, Value>,
}

impl Default for Manifest {
    fn default() -> Self {
        let mut document = Map::new();
        document.insert(ASSIMILATORS.to_string(), Value::Object(Map::new()));
        document.insert(CURVES.to_string(), Value::Object(Map::new()));
        Self { document }
    }
}

impl Manifest {
    /// Parses a manifest, rejecting documents that lack one of the two
    /// top-level mappings.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let value = serde_json::from_str::<Value>(json).map_err(|err| err.to_string())?;
        let document = match value {
            Value::Object(document) => document,
            other => return Err(format!("expected a JSON object, found {other}")),
        };
        match document.get(ASSIMILATORS) {
            Some(Value::Object(_)) => (),
            Some(_) => return Err(format!("`{ASSIMILATORS}` is not an object")),
            None => return Err(format!("missing `{ASSIMILATORS}`")),
        }
        if !document.contains_key(CURVES) {
            return Err(format!("missing `{CURVES}`"));
        }
        Ok(Self { document })
    }

    /// Serializes with 4 space indentation and no trailing newline.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.document.serialize(&mut serializer)?;
        String::from_utf8(buffer).map_err(serde_json::Error::custom)
    }

    pub fn assimilators(&self) -> &Map<String, Value> {
        match self.document.get(ASSIMILATORS) {
            Some(Value::Object(assimilators)) => assimilators,
            _ => unreachable!("validated on construction"),
        }
    }

    pub fn assimilator(&self, name: &str) -> Option<&str> {
        self.assimilators().get(name).and_then(Value::as_str)
    }

    pub fn curves(&self) -> &Value {
        &self.document[CURVES]
    }

    /// Records `address` under `name`, replacing any previous entry.
    pub fn set_assimilator(&mut self, name: &str, address: Address) {
        let Some(Value::Object(assimilators)) = self.document.get_mut(ASSIMILATORS) else {
            unreachable!("validated on construction");
        };
        assimilators.insert(name.to_string(), Value::String(address.to_checksum(None)));
    }
}

/// A manifest file on disk.
#[derive(Debug, Clone)]
pub struct ManifestFile {
    path: PathBuf,
    write_mode: WriteMode,
}

impl ManifestFile {
    pub fn new(path: PathBuf, write_mode: WriteMode) -> Self {
        Self { path, write_mode }
    }

    pub fn for_chain(deployments_dir: &Path, chain_id: u64, write_mode: WriteMode) -> Self {
        Self::new(path(deployments_dir, chain_id), write_mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an empty manifest if the file does not exist yet.
    pub fn initialize_if_missing(&self) -> Result<(), ManifestError> {
        if self.path.exists() {
            return Ok(());
        }
        tracing::debug!(path = %self.path.display(), "creating empty manifest");
        self.store(&Manifest::default())
    }

    /// Fails if the manifest could not be recorded later on: the network
    /// directory is missing or an existing file is malformed. Nothing is
    /// written.
    pub fn check_writable(&self) -> Result<(), ManifestError> {
        let directory = self.directory();
        if !directory.is_dir() {
            return Err(ManifestError::MissingDirectory(directory.to_path_buf()));
        }
        if self.path.exists() {
            self.load()?;
        }
        Ok(())
    }

    pub fn load(&self) -> Result<Manifest, ManifestError> {
        let json = fs::read_to_string(&self.path).map_err(|err| self.io_error(err))?;
        Manifest::from_json(&json).map_err(|reason| ManifestError::Malformed {
            path: self.path.clone(),
            reason,
        })
    }

    pub fn store(&self, manifest: &Manifest) -> Result<(), ManifestError> {
        let json = manifest
            .to_json()
            .map_err(|source| ManifestError::Serialize {
                path: self.path.clone(),
                source,
            })?;
        let result = match self.write_mode {
            WriteMode::Overwrite => fs::write(&self.path, json),
            WriteMode::Atomic => self.replace_atomically(json.as_bytes()),
        };
        result.map_err(|err| self.io_error(err))
    }

    /// Read, update and write back the manifest so that `name` points at
    /// `address`. Creates the file first if it does not exist.
    pub fn record_assimilator(&self, name: &str, address: Address) -> Result<(), ManifestError> {
        self.initialize_if_missing()?;
        let mut manifest = self.load()?;
        if let Some(previous) = manifest.assimilator(name) {
            tracing::info!(%name, %previous, "replacing recorded address");
        }
        manifest.set_assimilator(name, address);
        self.store(&manifest)
    }

    fn replace_atomically(&self, contents: &[u8]) -> io::Result<()> {
        let mut file = tempfile::NamedTempFile::new_in(self.directory())?;
        file.write_all(contents)?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    fn io_error(&self, source: io::Error) -> ManifestError {
        if source.kind() == io::ErrorKind::NotFound && !self.directory().is_dir() {
            return ManifestError::MissingDirectory(self.directory().to_path_buf());
        }
        ManifestError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
