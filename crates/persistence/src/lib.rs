#![deny(warnings)]

//! Run export: one numbered JSON document per simulation run.
//!
//! The document is rewritten after every year so an interrupted run still
//! leaves its history behind.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sim_core::{HouseholdRecord, SimConfig, YearSnapshot};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const FILE_PREFIX: &str = "simulation_data_";
const FILE_SUFFIX: &str = ".json";

/// Identifies a run and the configuration it was started with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run: u32,
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    pub config: SimConfig,
}

/// Everything written for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunDocument {
    pub metadata: RunMetadata,
    pub years: Vec<YearSnapshot>,
    #[serde(default)]
    pub households: Vec<HouseholdRecord>,
}

/// File name for run number `run`.
pub fn run_file_name(run: u32) -> String {
    format!("{FILE_PREFIX}{run:03}{FILE_SUFFIX}")
}

fn existing_runs(dir: &Path) -> Result<u32> {
    let mut count = 0;
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
            count += 1;
        }
    }
    Ok(count)
}

/// Writes a [`RunDocument`] into an output folder.
#[derive(Debug)]
pub struct RunWriter {
    path: PathBuf,
    document: RunDocument,
}

impl RunWriter {
    /// Create the folder if needed and claim the next run number
    /// (existing run files + 1).
    pub fn create(dir: impl AsRef<Path>, config: &SimConfig) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        let mut run = existing_runs(dir)? + 1;
        while dir.join(run_file_name(run)).exists() {
            run += 1;
        }
        let writer = Self {
            path: dir.join(run_file_name(run)),
            document: RunDocument {
                metadata: RunMetadata {
                    run,
                    created_at: Utc::now(),
                    seed: config.seed,
                    config: config.clone(),
                },
                years: Vec::new(),
                households: Vec::new(),
            },
        };
        writer.flush()?;
        info!(path = %writer.path.display(), run, "run file created");
        Ok(writer)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run(&self) -> u32 {
        self.document.metadata.run
    }

    pub fn document(&self) -> &RunDocument {
        &self.document
    }

    /// Append one year and rewrite the file.
    pub fn append_year(&mut self, snapshot: &YearSnapshot) -> Result<()> {
        self.document.years.push(snapshot.clone());
        debug!(year = snapshot.year, "year written");
        self.flush()
    }

    /// Store the final household report and rewrite the file.
    pub fn write_households(&mut self, households: Vec<HouseholdRecord>) -> Result<()> {
        self.document.households = households;
        self.flush()
    }

    fn flush(&self) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("creating {}", self.path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, &self.document)
            .with_context(|| format!("serializing run {}", self.run()))?;
        out.flush()
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

/// Read a run file back.
pub fn load_run(path: impl AsRef<Path>) -> Result<RunDocument> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
