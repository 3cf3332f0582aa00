//! The module responsible for writing output data to disk.
use crate::assembly::ObjectiveSummary;
use crate::balance::{ViolationResult, ZoneID};
use crate::capacity::CapacityResult;
use crate::operations::DispatchResult;
use crate::project::ProjectID;
use crate::reserves::ProvisionResult;
use crate::temporal::{PeriodID, TimepointID};
use anyhow::{Context, Result, ensure};
use std::collections::HashSet;
use std::fmt::Display;
use std::fs::{self, File};
use std::hash::Hash;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The output file name for capacity by project and period
const CAPACITY_FILE_NAME: &str = "capacity.csv";

/// The output file name for dispatch by project and timepoint
const DISPATCH_FILE_NAME: &str = "dispatch.csv";

/// The output file name for reserve provision by project and timepoint
const PROVISION_FILE_NAME: &str = "reserve_provision.csv";

/// The output file name for balance violations
const VIOLATIONS_FILE_NAME: &str = "balance_violations.csv";

/// The output file name for the objective breakdown
const OBJECTIVE_FILE_NAME: &str = "objective.toml";

/// Get the default output directory for the model
pub fn get_output_dir(model_dir: &Path, results_root: PathBuf) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([results_root, model_name.into()].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data
///
/// # Arguments
///
/// * `output_dir` - The output directory to create/overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// True if the output dir contained existing data that was deleted, false if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
             Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// A CSV writer which refuses to write the same row key twice
struct KeyedWriter<K> {
    file_name: &'static str,
    writer: csv::Writer<File>,
    keys: HashSet<K>,
}

impl<K: Eq + Hash + Display> KeyedWriter<K> {
    fn create(output_path: &Path, file_name: &'static str) -> Result<Self> {
        let file_path = output_path.join(file_name);
        let writer = csv::Writer::from_path(&file_path)
            .with_context(|| format!("Could not create {}", file_path.display()))?;

        Ok(Self {
            file_name,
            writer,
            keys: HashSet::new(),
        })
    }

    fn write<T: serde::Serialize>(&mut self, key: K, row: &T) -> Result<()> {
        ensure!(
            !self.keys.contains(&key),
            "Duplicate row for {key} in {}",
            self.file_name
        );
        self.writer.serialize(row)?;
        self.keys.insert(key);

        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Identifies a row of `capacity.csv`
#[derive(PartialEq, Eq, Hash)]
struct CapacityKey(ProjectID, PeriodID);

impl Display for CapacityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "project '{}', period '{}'", self.0, self.1)
    }
}

/// Identifies a row of `dispatch.csv`
#[derive(PartialEq, Eq, Hash)]
struct DispatchKey(ProjectID, TimepointID);

impl Display for DispatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "project '{}', timepoint '{}'", self.0, self.1)
    }
}

/// Identifies a row of `reserve_provision.csv`
#[derive(PartialEq, Eq, Hash)]
struct ProvisionKey(String, ProjectID, TimepointID);

impl Display for ProvisionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "product '{}', project '{}', timepoint '{}'",
            self.0, self.1, self.2
        )
    }
}

/// Identifies a row of `balance_violations.csv`
#[derive(PartialEq, Eq, Hash)]
struct ViolationKey(String, ZoneID, TimepointID);

impl Display for ViolationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "product '{}', zone '{}', timepoint '{}'",
            self.0, self.1, self.2
        )
    }
}

/// An object for writing the results of a solved model to file
pub struct DataWriter {
    output_path: PathBuf,
    capacity_writer: KeyedWriter<CapacityKey>,
    dispatch_writer: KeyedWriter<DispatchKey>,
    provision_writer: KeyedWriter<ProvisionKey>,
    violations_writer: KeyedWriter<ViolationKey>,
}

impl DataWriter {
    /// Open CSV files in `output_path` to write results to
    pub fn create(output_path: &Path) -> Result<Self> {
        Ok(Self {
            output_path: output_path.to_path_buf(),
            capacity_writer: KeyedWriter::create(output_path, CAPACITY_FILE_NAME)?,
            dispatch_writer: KeyedWriter::create(output_path, DISPATCH_FILE_NAME)?,
            provision_writer: KeyedWriter::create(output_path, PROVISION_FILE_NAME)?,
            violations_writer: KeyedWriter::create(output_path, VIOLATIONS_FILE_NAME)?,
        })
    }

    /// Write the capacity of a project in a period
    pub fn write_capacity(&mut self, result: &CapacityResult) -> Result<()> {
        let key = CapacityKey(result.project.clone(), result.period);
        self.capacity_writer.write(key, result)
    }

    /// Write the dispatch of a project in a timepoint
    pub fn write_dispatch(&mut self, result: &DispatchResult) -> Result<()> {
        let key = DispatchKey(result.project.clone(), result.timepoint);
        self.dispatch_writer.write(key, result)
    }

    /// Write the reserve provided by a project in a timepoint
    pub fn write_provision(&mut self, result: &ProvisionResult) -> Result<()> {
        let key = ProvisionKey(
            result.product.clone(),
            result.project.clone(),
            result.timepoint,
        );
        self.provision_writer.write(key, result)
    }

    /// Write a balance violation
    pub fn write_violation(&mut self, result: &ViolationResult) -> Result<()> {
        let key = ViolationKey(result.product.clone(), result.zone.clone(), result.timepoint);
        self.violations_writer.write(key, result)
    }

    /// Write the objective value and its breakdown by period
    pub fn write_objective(&self, summary: &ObjectiveSummary) -> Result<()> {
        let file_path = self.output_path.join(OBJECTIVE_FILE_NAME);
        fs::write(&file_path, toml::to_string(summary)?)
            .with_context(|| format!("Could not write {}", file_path.display()))?;

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.capacity_writer.flush()?;
        self.dispatch_writer.flush()?;
        self.provision_writer.flush()?;
        self.violations_writer.flush()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::PeriodCost;
    use crate::fixture::{assert_error, periods};
    use crate::project::CapacityType;
    use crate::temporal::PeriodData;
    use itertools::Itertools;
    use rstest::rstest;
    use std::io::BufRead;
    use tempfile::tempdir;

    fn capacity_result(period: PeriodID) -> CapacityResult {
        CapacityResult {
            project: "gas".into(),
            period,
            technology: "gas".into(),
            load_zone: "north".into(),
            capacity_type: CapacityType::ExistingGenNoEconomicRetirement,
            capacity_mw: 100.0,
            new_build_mw: None,
            retired_mw: None,
        }
    }

    fn read_lines(path: &Path) -> Vec<String> {
        let file = File::open(path).unwrap();
        std::io::BufReader::new(file)
            .lines()
            .map(|line| line.unwrap())
            .collect_vec()
    }

    #[test]
    fn test_write_capacity() {
        let dir = tempdir().unwrap();

        // Write a capacity result
        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_capacity(&capacity_result(2020)).unwrap();
            writer.flush().unwrap();
        }

        assert_eq!(
            read_lines(&dir.path().join(CAPACITY_FILE_NAME)),
            [
                "project,period,technology,load_zone,capacity_type,capacity_mw,new_build_mw,\
                 retired_mw",
                "gas,2020,gas,north,existing_gen_no_economic_retirement,100.0,,"
            ]
        );
    }

    #[test]
    fn test_duplicate_capacity_row() {
        let dir = tempdir().unwrap();
        let mut writer = DataWriter::create(dir.path()).unwrap();
        writer.write_capacity(&capacity_result(2020)).unwrap();
        writer.write_capacity(&capacity_result(2030)).unwrap();
        assert_error!(
            writer.write_capacity(&capacity_result(2020)),
            "Duplicate row for project 'gas', period '2020' in capacity.csv"
        );
    }

    #[test]
    fn test_duplicate_violation_row() {
        let dir = tempdir().unwrap();
        let mut writer = DataWriter::create(dir.path()).unwrap();
        let result = ViolationResult {
            product: "energy".into(),
            zone: "north".into(),
            timepoint: 1,
            requirement: 60.0,
            violation: 0.0,
        };
        writer.write_violation(&result).unwrap();

        // The same zone and timepoint for another product is a different row
        let other = ViolationResult {
            product: "regulation_up".into(),
            ..result.clone()
        };
        writer.write_violation(&other).unwrap();

        assert_error!(
            writer.write_violation(&result),
            "Duplicate row for product 'energy', zone 'north', timepoint '1' in \
             balance_violations.csv"
        );
    }

    #[test]
    fn test_write_provision() {
        let dir = tempdir().unwrap();
        let result = ProvisionResult {
            product: "regulation_up".into(),
            project: "ccgt".into(),
            period: 2020,
            timepoint: 3,
            provision_mw: 12.5,
        };

        {
            let mut writer = DataWriter::create(dir.path()).unwrap();
            writer.write_provision(&result).unwrap();
            assert_error!(
                writer.write_provision(&result),
                "Duplicate row for product 'regulation_up', project 'ccgt', timepoint '3' in \
                 reserve_provision.csv"
            );
            writer.flush().unwrap();
        }

        assert_eq!(
            read_lines(&dir.path().join(PROVISION_FILE_NAME)),
            [
                "product,project,period,timepoint,provision_mw",
                "regulation_up,ccgt,2020,3,12.5"
            ]
        );
    }

    #[rstest]
    fn test_write_objective(periods: Vec<PeriodData>) {
        let dir = tempdir().unwrap();
        let writer = DataWriter::create(dir.path()).unwrap();
        let period = crate::temporal::Period {
            id: periods[1].period,
            discount_factor: periods[1].discount_factor,
            number_years_represented: periods[1].number_years_represented,
        };
        let summary = ObjectiveSummary {
            total_cost: 500.0,
            periods: vec![PeriodCost::new(&period, 100.0)],
        };
        writer.write_objective(&summary).unwrap();

        let contents = fs::read_to_string(dir.path().join(OBJECTIVE_FILE_NAME)).unwrap();
        let value: toml::Value = toml::from_str(&contents).unwrap();
        assert_eq!(value["total_cost"].as_float(), Some(500.0));
        assert_eq!(value["periods"][0]["period"].as_integer(), Some(2030));
        assert_eq!(value["periods"][0]["discounted_cost"].as_float(), Some(500.0));
    }

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("new_output");

        // Create a new directory should succeed and return false (no overwrite)
        let result = create_output_directory(&output_dir, false).unwrap();
        assert!(!result);
        assert!(output_dir.exists());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("empty_output");
        fs::create_dir(&output_dir).unwrap();

        // Existing empty directory should return false (no overwrite needed)
        let result = create_output_directory(&output_dir, false).unwrap();
        assert!(!result);
        assert!(output_dir.exists());
    }

    #[rstest]
    #[case(false)]
    #[case(true)]
    fn test_create_output_directory_existing_with_files(#[case] allow_overwrite: bool) {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("output_with_files");
        fs::create_dir(&output_dir).unwrap();
        fs::write(output_dir.join("capacity.csv"), "old").unwrap();

        let result = create_output_directory(&output_dir, allow_overwrite);
        if allow_overwrite {
            assert!(result.unwrap());
            assert!(!output_dir.join("capacity.csv").exists());
        } else {
            assert!(result.is_err());
        }
    }
}
