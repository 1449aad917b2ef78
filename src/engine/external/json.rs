use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::core::domain::Structure;
use crate::engine::external::process::{EngineInput, InputWriter};
use crate::engine::readers::{OutputReader, ProgressLog, ResultsReport};

/// Name of the document written by [`JsonInputWriter`].
pub const INPUT_FILE: &str = "engine_input.json";

/// Writes the whole run input as one JSON document, for engines driven
/// through a wrapper script that does its own templating.
#[derive(Debug, Clone, Default)]
pub struct JsonInputWriter;

impl InputWriter for JsonInputWriter {
    fn write_inputs(&self, workspace: &Path, input: &EngineInput) -> Result<()> {
        let path = workspace.join(INPUT_FILE);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, input)
            .with_context(|| format!("Failed to serialize {}", path.display()))?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "JSON input"
    }
}

/// Reads artifacts that were written as JSON documents shaped like
/// [`ResultsReport`], [`ProgressLog`] and [`Structure`].
#[derive(Debug, Clone, Default)]
pub struct JsonArtifactReader;

impl JsonArtifactReader {
    fn load<T: DeserializeOwned>(path: &Path) -> Option<T> {
        if !path.is_file() {
            return None;
        }
        let parsed = File::open(path)
            .map_err(anyhow::Error::from)
            .and_then(|f| serde_json::from_reader(BufReader::new(f)).map_err(anyhow::Error::from));
        match parsed {
            Ok(value) => Some(value),
            Err(e) => {
                // Engines write these incrementally; a half-written file is expected.
                log::debug!(target: "cellrelax", "{} not readable yet: {}", path.display(), e);
                None
            }
        }
    }
}

impl OutputReader for JsonArtifactReader {
    fn read_results(&self, path: &Path) -> ResultsReport {
        Self::load(path).unwrap_or_default()
    }

    fn read_progress_log(&self, path: &Path) -> ProgressLog {
        Self::load(path).unwrap_or_default()
    }

    fn read_final_geometry(&self, path: &Path) -> Option<Structure> {
        Self::load(path)
    }
}
