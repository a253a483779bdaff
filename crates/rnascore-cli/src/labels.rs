//! Reader for the tabular labels format shared by reference and submission files.
//!
//! One row per residue: `ID` (`<target>_<residue>`), `resname`, `resid`, then one
//! `x_k, y_k, z_k` triple per model, and optionally a `chain` column. Rows of a target
//! are ordered by `resid`. A model slot holding a coordinate at or below
//! [`UNUSED_SLOT_SENTINEL`] (or an empty cell) is unused and dropped for that target.

use crate::error::{CliError, Result};
use nalgebra::Point3;
use rnascore::ChainSet;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const UNUSED_SLOT_SENTINEL: f64 = -1e17;
const DEFAULT_CHAIN: &str = "A";

#[derive(Debug, Error)]
pub enum LabelsError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("no coordinate columns found (expected x_1, y_1, z_1, ...)")]
    NoModels,

    #[error("line {line}: invalid value '{value}' in column '{column}'")]
    InvalidNumber {
        line: u64,
        column: String,
        value: String,
    },

    #[error("line {line}: ID '{id}' does not have the form <target>_<residue>")]
    InvalidId { line: u64, id: String },
}

/// Every model found for one target, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetModels {
    pub target_id: String,
    pub models: Vec<ChainSet>,
}

struct Columns {
    names: Vec<String>,
    id: usize,
    resid: usize,
    chain: Option<usize>,
    models: Vec<[usize; 3]>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> std::result::Result<Self, LabelsError> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let find = |name: &str| names.iter().position(|h| h == name);

        let id = find("ID").ok_or(LabelsError::MissingColumn("ID"))?;
        let resid = find("resid").ok_or(LabelsError::MissingColumn("resid"))?;
        let chain = find("chain");
        let models: Vec<[usize; 3]> = (1..)
            .map_while(|k| {
                Some([
                    find(&format!("x_{k}"))?,
                    find(&format!("y_{k}"))?,
                    find(&format!("z_{k}"))?,
                ])
            })
            .collect();
        if models.is_empty() {
            return Err(LabelsError::NoModels);
        }

        Ok(Self {
            names,
            id,
            resid,
            chain,
            models,
        })
    }
}

struct Residue {
    resid: i64,
    chain: String,
    /// One entry per model; `None` marks an unused slot.
    coords: Vec<Option<Point3<f64>>>,
}

fn invalid_number(columns: &Columns, index: usize, line: u64, value: &str) -> LabelsError {
    LabelsError::InvalidNumber {
        line,
        column: columns.names.get(index).cloned().unwrap_or_default(),
        value: value.to_string(),
    }
}

fn parse_coordinate(
    record: &csv::StringRecord,
    columns: &Columns,
    index: usize,
    line: u64,
) -> std::result::Result<Option<f64>, LabelsError> {
    let raw = record.get(index).unwrap_or_default();
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid_number(columns, index, line, raw))?;
    Ok((value.is_finite() && value > UNUSED_SLOT_SENTINEL).then_some(value))
}

fn parse_residue(
    record: &csv::StringRecord,
    columns: &Columns,
) -> std::result::Result<(String, Residue), LabelsError> {
    let line = record.position().map_or(0, |p| p.line());

    let id = record.get(columns.id).unwrap_or_default();
    let target_id = id
        .rsplit_once('_')
        .map(|(target, _)| target)
        .filter(|target| !target.is_empty())
        .ok_or_else(|| LabelsError::InvalidId {
            line,
            id: id.to_string(),
        })?;

    let raw_resid = record.get(columns.resid).unwrap_or_default();
    let resid: i64 = raw_resid
        .parse()
        .map_err(|_| invalid_number(columns, columns.resid, line, raw_resid))?;

    let chain = columns
        .chain
        .and_then(|c| record.get(c))
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_CHAIN)
        .to_string();

    let coords = columns
        .models
        .iter()
        .map(|&[x, y, z]| {
            let x = parse_coordinate(record, columns, x, line)?;
            let y = parse_coordinate(record, columns, y, line)?;
            let z = parse_coordinate(record, columns, z, line)?;
            Ok(match (x, y, z) {
                (Some(x), Some(y), Some(z)) => Some(Point3::new(x, y, z)),
                _ => None,
            })
        })
        .collect::<std::result::Result<Vec<_>, LabelsError>>()?;

    Ok((
        target_id.to_string(),
        Residue {
            resid,
            chain,
            coords,
        },
    ))
}

fn assemble_models(target_id: &str, residues: &[Residue], model_count: usize) -> Vec<ChainSet> {
    (0..model_count)
        .filter_map(|k| {
            let mut model = ChainSet::new();
            for residue in residues {
                let Some(point) = residue.coords[k] else {
                    debug!(target_id, model = k + 1, "Skipping unused model slot.");
                    return None;
                };
                model.push_point(&residue.chain, point);
            }
            Some(model)
        })
        .collect()
}

/// Parses labels from any reader. Targets keep the order of their first row.
pub fn parse_labels<R: Read>(reader: R) -> std::result::Result<Vec<TargetModels>, LabelsError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = Columns::locate(csv_reader.headers()?)?;

    let mut order: Vec<String> = Vec::new();
    let mut by_target: HashMap<String, Vec<Residue>> = HashMap::new();

    for record in csv_reader.records() {
        let (target_id, residue) = parse_residue(&record?, &columns)?;
        match by_target.get_mut(&target_id) {
            Some(residues) => residues.push(residue),
            None => {
                order.push(target_id.clone());
                by_target.insert(target_id, vec![residue]);
            }
        }
    }

    let targets = order
        .into_iter()
        .filter_map(|target_id| {
            let mut residues = by_target.remove(&target_id)?;
            residues.sort_by_key(|r| r.resid);
            let models = assemble_models(&target_id, &residues, columns.models.len());
            if models.is_empty() {
                warn!(target_id = %target_id, "Target has no usable model.");
            }
            Some(TargetModels { target_id, models })
        })
        .collect();
    Ok(targets)
}

pub fn load_labels(path: &Path) -> Result<Vec<TargetModels>> {
    info!("Loading labels from {:?}", path);
    let file = std::fs::File::open(path)?;
    let targets = parse_labels(file).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    info!(
        targets = targets.len(),
        "Loaded labels from {}.",
        path.display()
    );
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn parse(text: &str) -> Vec<TargetModels> {
        parse_labels(text.as_bytes()).unwrap()
    }

    #[test]
    fn rows_are_grouped_by_target_and_sorted_by_resid() {
        let targets = parse(
            "ID,resname,resid,x_1,y_1,z_1\n\
             R1107_2,G,2,2.0,0.0,0.0\n\
             R1107_1,G,1,1.0,0.0,0.0\n\
             8ABC_1,A,1,5.0,5.0,5.0\n\
             R1107_3,C,3,3.0,0.0,0.0\n",
        );

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].target_id, "R1107");
        assert_eq!(targets[1].target_id, "8ABC");

        let points = targets[0].models[0].get("A").unwrap();
        let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn target_id_keeps_inner_underscores() {
        let targets = parse("ID,resname,resid,x_1,y_1,z_1\n1ABC_B_12,U,12,0,0,0\n");
        assert_eq!(targets[0].target_id, "1ABC_B");
    }

    #[test]
    fn every_coordinate_triple_is_a_model() {
        let targets = parse(
            "ID,resname,resid,x_1,y_1,z_1,x_2,y_2,z_2,x_3,y_3,z_3\n\
             T1_1,A,1,0,0,0,1,1,1,2,2,2\n\
             T1_2,A,2,3,0,0,4,1,1,5,2,2\n",
        );

        let models = &targets[0].models;
        assert_eq!(models.len(), 3);
        assert_eq!(models[2].get("A").unwrap()[1], Point3::new(5.0, 2.0, 2.0));
    }

    #[test]
    fn sentinel_and_empty_slots_drop_the_model() {
        let targets = parse(
            "ID,resname,resid,x_1,y_1,z_1,x_2,y_2,z_2,x_3,y_3,z_3\n\
             T1_1,A,1,0,0,0,-1e18,-1e18,-1e18,1,1,1\n\
             T1_2,A,2,3,0,0,4,1,1,,,\n",
        );

        let models = &targets[0].models;
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].total_points(), 2);
    }

    #[test]
    fn chain_column_splits_models_into_chains() {
        let targets = parse(
            "ID,resname,resid,x_1,y_1,z_1,chain,copy\n\
             T2_1,G,1,0,0,0,A,1\n\
             T2_2,G,2,1,0,0,A,1\n\
             T2_3,C,3,2,0,0,B,1\n",
        );

        let model = &targets[0].models[0];
        assert_eq!(model.chain_ids().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(model.get("A").unwrap().len(), 2);
        assert_eq!(model.get("B").unwrap().len(), 1);
    }

    #[test]
    fn missing_columns_are_reported() {
        let err = parse_labels("resname,resid,x_1,y_1,z_1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LabelsError::MissingColumn("ID")));

        let err = parse_labels("ID,resname,resid\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LabelsError::NoModels));
    }

    #[test]
    fn malformed_values_name_line_and_column() {
        let err = parse_labels("ID,resname,resid,x_1,y_1,z_1\nT1_1,A,1,0,zero,0\n".as_bytes())
            .unwrap_err();
        match err {
            LabelsError::InvalidNumber { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "y_1");
                assert_eq!(value, "zero");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err =
            parse_labels("ID,resname,resid,x_1,y_1,z_1\nT1,A,1,0,0,0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, LabelsError::InvalidId { .. }));
    }

    #[test]
    fn load_labels_wraps_parse_errors_with_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        fs::write(&path, "ID,resid\nT1_1,1\n").unwrap();

        let err = load_labels(&path).unwrap_err();

        assert!(matches!(err, CliError::FileParsing { .. }));
        assert!(err.to_string().contains("labels.csv"));
    }

    #[test]
    fn load_labels_reads_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        fs::write(&path, "ID,resname,resid,x_1,y_1,z_1\nT1_1,A,1,0,0,0\n").unwrap();

        let targets = load_labels(&path).unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].models.len(), 1);
    }
}
