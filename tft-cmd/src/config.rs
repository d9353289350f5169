//! Run configuration loaded from a JSON file.
//!
//! ```text
//! {
//!   "title": "Northern transects",
//!   "output_dir": "out",
//!   "cov_threshold": 3.0,
//!   "transects": [
//!     {
//!       "name": "T1",
//!       "nodes": [[12, 13, 14], [12, 13], [13, 14]],
//!       "target": "target_T1.csv",
//!       "runs": [{ "name": "ALT5", "mesh": "alt5.json" }],
//!       "segments": [{ "wall": [12, 13], "waterbody": [300101, 300102] }],
//!       "seasons": [[11, 1, 4, 30]]
//!     }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tft_data::{SeasonRange, DEFAULT_COV_THRESHOLD};
use tft_mesh::{SegmentOverride, Transect};
use thiserror::Error;

/// A configuration problem, naming the file and the offending field.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{file}: {field}: {message}")]
pub struct ConfigError {
    pub file: String,
    pub field: String,
    pub message: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_cov_threshold() -> f64 {
    DEFAULT_COV_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_cov_threshold")]
    pub cov_threshold: f64,
    pub transects: Vec<TransectGroupConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransectGroupConfig {
    pub name: String,
    /// One-based node ids, one list per sub-transect.
    pub nodes: Vec<Vec<u32>>,
    #[serde(default)]
    pub target: Option<PathBuf>,
    #[serde(default)]
    pub runs: Vec<RunSpec>,
    #[serde(default)]
    pub segments: Vec<SegmentConfig>,
    /// `[start_month, start_day, end_month, end_day]`
    #[serde(default)]
    pub seasons: Vec<[u32; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    pub name: String,
    #[serde(default)]
    pub mesh: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub wall: [u32; 2],
    pub waterbody: [i64; 2],
}

impl RunConfig {
    /// Read, validate and resolve the paths of a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        let mut config = Self::from_json_str(&json, &path.display().to_string())?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_json_str(json: &str, file: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(json).map_err(|e| ConfigError {
            file: file.to_string(),
            field: format!("line {}", e.line()),
            message: e.to_string(),
        })?;
        config.validate(file)?;
        Ok(config)
    }

    pub fn validate(&self, file: &str) -> Result<(), ConfigError> {
        let error = |field: String, message: String| ConfigError {
            file: file.to_string(),
            field,
            message,
        };
        if self.transects.is_empty() {
            return Err(error("transects".into(), "no transect groups defined".into()));
        }
        if self.cov_threshold.is_nan() || self.cov_threshold <= 0.0 {
            return Err(error(
                "cov_threshold".into(),
                format!("must be positive, found {}", self.cov_threshold),
            ));
        }
        for (g, group) in self.transects.iter().enumerate() {
            let field = |name: &str| format!("transects[{g}].{name}");
            if group.name.trim().is_empty() {
                return Err(error(field("name"), "transect group has no name".into()));
            }
            if group.nodes.is_empty() {
                return Err(error(field("nodes"), "no node lists defined".into()));
            }
            for (n, nodes) in group.nodes.iter().enumerate() {
                Transect::from_one_based(nodes)
                    .map_err(|e| error(field(&format!("nodes[{n}]")), e.to_string()))?;
            }
            for (s, season) in group.seasons.iter().enumerate() {
                SeasonRange::from_array(*season)
                    .map_err(|e| error(field(&format!("seasons[{s}]")), e.to_string()))?;
            }
            for (s, segment) in group.segments.iter().enumerate() {
                SegmentOverride::from_one_based(segment.wall, segment.waterbody)
                    .map_err(|e| error(field(&format!("segments[{s}]")), e.to_string()))?;
            }
            for (r, run) in group.runs.iter().enumerate() {
                if run.name.trim().is_empty() {
                    return Err(error(field(&format!("runs[{r}].name")), "run has no name".into()));
                }
                if run.mesh.as_os_str().is_empty() {
                    return Err(error(
                        field(&format!("runs[{r}].mesh")),
                        format!("run '{}' has no mesh path", run.name),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Make relative mesh, target and output paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.output_dir);
        for group in &mut self.transects {
            if let Some(target) = group.target.as_mut() {
                resolve(target);
            }
            for run in &mut group.runs {
                resolve(&mut run.mesh);
            }
        }
    }
}

impl TransectGroupConfig {
    pub fn transects(&self) -> anyhow::Result<Vec<Transect>> {
        self.nodes
            .iter()
            .map(|nodes| Transect::from_one_based(nodes).map_err(anyhow::Error::from))
            .collect()
    }

    pub fn season_ranges(&self) -> anyhow::Result<Vec<SeasonRange>> {
        self.seasons
            .iter()
            .map(|season| SeasonRange::from_array(*season).map_err(anyhow::Error::from))
            .collect()
    }

    pub fn segment_overrides(&self) -> anyhow::Result<Vec<SegmentOverride>> {
        self.segments
            .iter()
            .map(|s| SegmentOverride::from_one_based(s.wall, s.waterbody).map_err(anyhow::Error::from))
            .collect()
    }
}
