//! Unpack one work unit into a scratch tree ready for normalization
//!
//! Source bundles wrap everything in a single top-level directory and ship
//! rendered PDFs next to the LaTeX sources. Staging strips both: the
//! wrapper is promoted away and the PDFs are dropped.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use papertab_core::RetryPolicy;
use tempfile::TempDir;

use crate::error::IngestError;
use crate::state::{UnitMode, WorkUnit};

/// Extensions of rendered documents that are discarded during promotion.
pub const RENDERED_EXTENSIONS: &[&str] = &["pdf"];

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const TAR_BLOCK: usize = 512;
/// Byte range of the checksum field inside a TAR header.
const CHECKSUM_FIELD: std::ops::Range<usize> = 148..156;
/// Temporary name for the wrapper directory while its children move up.
const PARKED_DIR: &str = ".papertab-wrapper";

/// Scratch directory for one unit with `flattened/` and `normalized/` subtrees.
///
/// Owned exclusively by the unit being processed; everything underneath is
/// deleted when the value is dropped, whether the unit succeeded or not.
#[derive(Debug)]
pub struct StagingArea {
    root: TempDir,
}

impl StagingArea {
    /// Create a fresh area under `scratch_dir` (system temp dir if `None`).
    pub fn create(scratch_dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("papertab-");
        let root = match scratch_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                builder.tempdir_in(dir)?
            }
            None => builder.tempdir()?,
        };
        fs::create_dir(root.path().join("flattened"))?;
        fs::create_dir(root.path().join("normalized"))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn flattened(&self) -> PathBuf {
        self.root.path().join("flattened")
    }

    pub fn normalized(&self) -> PathBuf {
        self.root.path().join("normalized")
    }
}

/// File counts collected while staging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageStats {
    pub files_seen: usize,
    pub rendered_discarded: usize,
}

impl AddAssign for StageStats {
    fn add_assign(&mut self, rhs: Self) {
        self.files_seen += rhs.files_seen;
        self.rendered_discarded += rhs.rendered_discarded;
    }
}

/// A staged unit: its scratch area and the tree to hand to normalization.
#[derive(Debug)]
pub struct StagedUnit {
    pub area: StagingArea,
    /// `area.flattened()` for archives, the input directory in gzip mode
    pub source_tree: PathBuf,
    pub stats: StageStats,
}

/// Compression detected by [`probe_archive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

/// Stages work units, retrying storage access with `retry`.
#[derive(Debug, Clone)]
pub struct ArchiveStager {
    retry: RetryPolicy,
    scratch_dir: Option<PathBuf>,
}

impl ArchiveStager {
    pub fn new(retry: RetryPolicy, scratch_dir: Option<PathBuf>) -> Self {
        Self { retry, scratch_dir }
    }

    /// Stage `unit`. An [`IngestError::InvalidArchive`] means the unit should be skipped.
    pub fn stage(&self, unit: &WorkUnit) -> Result<StagedUnit, IngestError> {
        match unit.mode {
            UnitMode::Tar => self.stage_tar(unit),
            UnitMode::GzipDirectory => self.stage_directory(unit),
        }
    }

    fn stage_tar(&self, unit: &WorkUnit) -> Result<StagedUnit, IngestError> {
        let compression = self.retry.run(&unit.name, || probe_archive(&unit.path))?;
        let area = StagingArea::create(self.scratch_dir.as_deref())?;
        let flattened = area.flattened();

        self.extract_fresh(&unit.name, &flattened, |dest| {
            extract(&unit.path, compression, dest)
        })?;

        let stats = promote_single_dir(&flattened)?;
        log::debug!(
            "{}: staged {} files ({} rendered documents removed)",
            unit.name,
            stats.files_seen,
            stats.rendered_discarded
        );
        Ok(StagedUnit {
            area,
            source_tree: flattened,
            stats,
        })
    }

    /// Run `extract` into `dest` under the retry policy, emptying `dest`
    /// before every attempt so a retry never sees a partial tree.
    fn extract_fresh<F>(&self, label: &str, dest: &Path, mut extract: F) -> Result<(), IngestError>
    where
        F: FnMut(&Path) -> Result<(), IngestError>,
    {
        self.retry.run(label, || {
            reset_dir(dest)?;
            extract(dest)
        })
    }

    fn stage_directory(&self, unit: &WorkUnit) -> Result<StagedUnit, IngestError> {
        let files_seen = self.retry.run(&unit.name, || {
            let mut n = 0;
            for entry in fs::read_dir(&unit.path)? {
                entry?;
                n += 1;
            }
            Ok::<_, IngestError>(n)
        })?;
        let area = StagingArea::create(self.scratch_dir.as_deref())?;
        Ok(StagedUnit {
            area,
            source_tree: unit.path.clone(),
            stats: StageStats {
                files_seen,
                rendered_discarded: 0,
            },
        })
    }
}

/// Check that `path` is a TAR archive, optionally gzip-compressed.
///
/// I/O failures come back as [`IngestError::Io`] (retryable); anything that
/// is readable but not a TAR archive is [`IngestError::InvalidArchive`].
pub fn probe_archive(path: &Path) -> Result<Compression, IngestError> {
    if fs::metadata(path)?.is_dir() {
        return Err(IngestError::invalid_archive(path, "is an unexpected directory"));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let compression = if reader.fill_buf()?.starts_with(&GZIP_MAGIC) {
        Compression::Gzip
    } else {
        Compression::None
    };
    let mut source: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(reader)),
        Compression::None => Box::new(reader),
    };

    let mut block = [0u8; TAR_BLOCK];
    match source.read_exact(&mut block) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(IngestError::invalid_archive(path, "is not a TAR archive"));
        }
        Err(e)
            if compression == Compression::Gzip
                && matches!(
                    e.kind(),
                    io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData
                ) =>
        {
            return Err(IngestError::invalid_archive(path, "has a corrupt gzip stream"));
        }
        Err(e) => return Err(e.into()),
    }

    if header_checksum_ok(&block) {
        Ok(compression)
    } else {
        Err(IngestError::invalid_archive(path, "is not a TAR archive"))
    }
}

/// Validate the checksum of the first TAR header block.
fn header_checksum_ok(block: &[u8; TAR_BLOCK]) -> bool {
    if block.iter().all(|&b| b == 0) {
        return false;
    }
    let Ok(stored) = tar::Header::from_byte_slice(block).cksum() else {
        return false;
    };
    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if CHECKSUM_FIELD.contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(b)
            }
        })
        .sum();
    stored == computed
}

fn extract(path: &Path, compression: Compression, dest: &Path) -> Result<(), IngestError> {
    let reader = BufReader::new(File::open(path)?);
    let source: Box<dyn Read> = match compression {
        Compression::Gzip => Box::new(GzDecoder::new(reader)),
        Compression::None => Box::new(reader),
    };
    tar::Archive::new(source)
        .unpack(dest)
        .map_err(|e| classify_extract_error(path, e))
}

/// Malformed archive content is final; everything else is assumed to be storage.
fn classify_extract_error(path: &Path, e: io::Error) -> IngestError {
    match e.kind() {
        io::ErrorKind::Other
        | io::ErrorKind::InvalidData
        | io::ErrorKind::InvalidInput
        | io::ErrorKind::UnexpectedEof => IngestError::Extract {
            path: path.to_path_buf(),
            source: e,
        },
        _ => IngestError::Io(e),
    }
}

fn reset_dir(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir(dir)
}

/// Whether `path` is a rendered document rather than a source file.
pub fn is_rendered_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            RENDERED_EXTENSIONS
                .iter()
                .any(|r| ext.eq_ignore_ascii_case(r))
        })
}

/// Promote the children of a single wrapping directory up into `root`.
///
/// Applies iff `root` holds exactly one entry and that entry is a directory;
/// any other shape is already flat and left untouched. Rendered documents
/// among the promoted children are deleted instead of moved.
pub fn promote_single_dir(root: &Path) -> io::Result<StageStats> {
    let entries = fs::read_dir(root)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;

    let mut stats = StageStats::default();
    let wrapper = match entries.as_slice() {
        [only] if fs::symlink_metadata(only)?.is_dir() => only,
        _ => {
            stats.files_seen = entries.len();
            return Ok(stats);
        }
    };

    // A child may share the wrapper's name.
    let parked = root.join(PARKED_DIR);
    fs::rename(wrapper, &parked)?;

    for entry in fs::read_dir(&parked)? {
        let entry = entry?;
        let path = entry.path();
        stats.files_seen += 1;
        if is_rendered_document(&path) && !entry.file_type()?.is_dir() {
            fs::remove_file(&path)?;
            stats.rendered_discarded += 1;
            continue;
        }
        fs::rename(&path, root.join(entry.file_name()))?;
    }
    fs::remove_dir(&parked)?;
    Ok(stats)
}
