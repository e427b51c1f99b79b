//! Disk spill of inactive series.
//!
//! Archived point lists are written to one temp file per series using a small
//! versioned binary layout:
//!
//! ```text
//! magic   b"SCPA"
//! version u16 LE (currently 1)
//! count   u64 LE
//! points  count * (x: f64 LE, y: f64 LE)
//! ```
//!
//! Files are owned by the series that spilled them and are removed when that
//! series is dropped, cleared or re-flushed.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::{DataPoint, Series};
use crate::error::{PlotError, PlotResult};

pub const ARCHIVE_MAGIC: [u8; 4] = *b"SCPA";
pub const ARCHIVE_VERSION: u16 = 1;

const HEADER_LEN: u64 = 4 + 2 + 8;
const POINT_LEN: u64 = 16;
const MAX_PREALLOCATED_POINTS: usize = 1 << 20;

/// Spill policy shared by every series of a plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Series with more points than this may be spilled.
    #[serde(default = "default_threshold_points")]
    pub threshold_points: usize,
    /// Folder for archive files; the process temp dir when `None`.
    #[serde(default)]
    pub folder: Option<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            threshold_points: default_threshold_points(),
            folder: None,
        }
    }
}

impl ArchiveConfig {
    #[must_use]
    pub fn with_threshold_points(mut self, threshold_points: usize) -> Self {
        self.threshold_points = threshold_points;
        self
    }

    #[must_use]
    pub fn with_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn validate(self) -> PlotResult<Self> {
        if self.threshold_points == 0 {
            return Err(PlotError::InvalidData(
                "archive threshold must be > 0 points".to_owned(),
            ));
        }
        Ok(self)
    }
}

fn default_threshold_points() -> usize {
    500_000
}

/// Result of one spill attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Points were written (or an up-to-date file was reused) and dropped from memory.
    Archived,
    AlreadyArchived,
    BelowThreshold,
    Visible,
    /// Writing failed; the in-memory points were kept.
    Failed,
}

/// Encodes a point list into the archive layout.
pub fn encode_points<W: Write>(writer: &mut W, points: &[DataPoint]) -> io::Result<()> {
    writer.write_all(&ARCHIVE_MAGIC)?;
    writer.write_all(&ARCHIVE_VERSION.to_le_bytes())?;
    writer.write_all(&(points.len() as u64).to_le_bytes())?;
    for point in points {
        writer.write_all(&point.x.to_le_bytes())?;
        writer.write_all(&point.y.to_le_bytes())?;
    }
    Ok(())
}

/// Decodes a point list written by [`encode_points`].
pub fn decode_points<R: Read>(reader: &mut R) -> PlotResult<Vec<DataPoint>> {
    decode(reader).map_err(|err| map_decode_error(err, None))
}

fn decode<R: Read>(reader: &mut R) -> io::Result<Vec<DataPoint>> {
    let mut magic = [0_u8; 4];
    reader.read_exact(&mut magic)?;
    if magic != ARCHIVE_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "bad archive magic",
        ));
    }

    let mut version = [0_u8; 2];
    reader.read_exact(&mut version)?;
    let version = u16::from_le_bytes(version);
    if version != ARCHIVE_VERSION {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported archive version {version}"),
        ));
    }

    let mut count = [0_u8; 8];
    reader.read_exact(&mut count)?;
    let count = usize::try_from(u64::from_le_bytes(count)).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidData, "archive point count overflows usize")
    })?;

    let mut points = Vec::with_capacity(count.min(MAX_PREALLOCATED_POINTS));
    let mut pair = [0_u8; 16];
    for _ in 0..count {
        reader.read_exact(&mut pair)?;
        let (x, y) = pair.split_at(8);
        points.push(DataPoint::new(
            f64::from_le_bytes(x.try_into().map_err(invalid_pair)?),
            f64::from_le_bytes(y.try_into().map_err(invalid_pair)?),
        ));
    }
    Ok(points)
}

fn invalid_pair(_: std::array::TryFromSliceError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "archive point is not 16 bytes")
}

fn map_decode_error(err: io::Error, path: Option<&Path>) -> PlotError {
    match err.kind() {
        io::ErrorKind::InvalidData => PlotError::ArchiveFormat(err.to_string()),
        io::ErrorKind::UnexpectedEof => {
            PlotError::ArchiveFormat("archive is truncated".to_owned())
        }
        _ => PlotError::Archive {
            path: path.map(Path::to_path_buf).unwrap_or_default(),
            source: err,
        },
    }
}

/// On-disk copy of one series' points.
#[derive(Debug)]
pub(crate) struct ArchiveFile {
    file: NamedTempFile,
    point_count: usize,
}

impl ArchiveFile {
    pub(crate) fn write(points: &[DataPoint], folder: Option<&Path>) -> PlotResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("stripchart-series-").suffix(".scpa");
        let file = match folder {
            Some(folder) => builder.tempfile_in(folder),
            None => builder.tempfile(),
        }
        .map_err(|source| PlotError::Archive {
            path: folder.map(Path::to_path_buf).unwrap_or_else(std::env::temp_dir),
            source,
        })?;

        let path = file.path().to_path_buf();
        let io_error = |source| PlotError::Archive {
            path: path.clone(),
            source,
        };
        {
            let mut writer = BufWriter::new(file.as_file());
            encode_points(&mut writer, points).map_err(io_error)?;
            writer.flush().map_err(io_error)?;
        }

        let expected_len = HEADER_LEN + POINT_LEN * points.len() as u64;
        let written_len = file.as_file().metadata().map_err(io_error)?.len();
        if written_len != expected_len {
            return Err(PlotError::ArchiveFormat(format!(
                "archive size mismatch: wrote {written_len} bytes, expected {expected_len}"
            )));
        }

        Ok(Self {
            file,
            point_count: points.len(),
        })
    }

    pub(crate) fn read(&self) -> PlotResult<Vec<DataPoint>> {
        let path = self.file.path();
        let handle = File::open(path).map_err(|source| PlotError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        let points =
            decode(&mut BufReader::new(handle)).map_err(|err| map_decode_error(err, Some(path)))?;
        if points.len() != self.point_count {
            return Err(PlotError::ArchiveFormat(format!(
                "archive holds {} points, expected {}",
                points.len(),
                self.point_count
            )));
        }
        Ok(points)
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    pub(crate) fn point_count(&self) -> usize {
        self.point_count
    }
}

/// Applies the spill policy to series and rehydrates them on demand.
#[derive(Debug, Clone, Default)]
pub struct ArchiveManager {
    config: ArchiveConfig,
}

impl ArchiveManager {
    #[must_use]
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ArchiveConfig) {
        self.config = config;
    }

    /// Spills a hidden series whose point count exceeds the threshold.
    ///
    /// I/O failures are logged and leave the series in memory.
    pub fn maybe_archive(&self, series: &Series) -> ArchiveOutcome {
        self.archive_in(series, self.config.folder.as_deref(), false)
    }

    /// Like [`ArchiveManager::maybe_archive`] but with an explicit folder, and
    /// with `include_visible` spilling on-screen series too.
    pub fn archive_in(
        &self,
        series: &Series,
        folder: Option<&Path>,
        include_visible: bool,
    ) -> ArchiveOutcome {
        let outcome = series.spill(self.config.threshold_points, folder, include_visible);
        match outcome {
            Ok(outcome) => {
                if outcome == ArchiveOutcome::Archived {
                    debug!(line = %series.id(), "archived series points");
                }
                outcome
            }
            Err(err) => {
                warn!(
                    line = %series.id(),
                    error = %err,
                    "series archive failed, keeping points in memory"
                );
                ArchiveOutcome::Failed
            }
        }
    }

    /// Reloads spilled points; a no-op for series that are already in memory.
    pub fn ensure_loaded(&self, series: &Series) -> PlotResult<()> {
        series.ensure_loaded()
    }
}
