use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::input::{InputError, SubjectId};

const BUILTIN_SPLITS: &str = include_str!("../../config/splits.json");

/// One predefined train/val/test scenario.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Partition {
    pub train: Vec<SubjectId>,
    pub val: Vec<SubjectId>,
    pub test: Vec<SubjectId>,
    #[serde(default)]
    pub test_groups: BTreeMap<String, Vec<SubjectId>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartitionTable {
    pub scenarios: BTreeMap<String, Partition>,
}

impl PartitionTable {
    pub fn builtin() -> Result<Self, InputError> {
        Self::from_json_str(BUILTIN_SPLITS, Path::new("<builtin splits>"))
    }

    pub fn load(path: &Path) -> Result<Self, InputError> {
        let raw = std::fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
        Self::from_json_str(&raw, path)
    }

    pub fn from_json_str(raw: &str, origin: &Path) -> Result<Self, InputError> {
        let table: PartitionTable =
            serde_json::from_str(raw).map_err(|source| InputError::Json {
                path: origin.to_path_buf(),
                source,
            })?;
        table.validate()?;
        tracing::debug!(
            origin = %origin.display(),
            scenarios = table.scenarios.len(),
            "loaded partition table"
        );
        Ok(table)
    }

    pub fn get(&self, setting: &str) -> Result<&Partition, InputError> {
        self.scenarios.get(setting).ok_or_else(|| {
            InputError::MissingInput(format!("unknown partition setting '{setting}'"))
        })
    }

    /// Concatenated test subjects of the given settings, in argument order.
    pub fn test_subjects(&self, settings: &[String]) -> Result<Vec<SubjectId>, InputError> {
        let mut out = Vec::new();
        for setting in settings {
            out.extend(self.get(setting)?.test.iter().cloned());
        }
        Ok(out)
    }

    pub fn test_group(&self, setting: &str, group: &str) -> Result<Vec<SubjectId>, InputError> {
        let partition = self.get(setting)?;
        partition.test_groups.get(group).cloned().ok_or_else(|| {
            InputError::MissingInput(format!(
                "setting '{setting}' has no test group '{group}'"
            ))
        })
    }

    fn validate(&self) -> Result<(), InputError> {
        if self.scenarios.is_empty() {
            return Err(InputError::InvalidInput(
                "partition table has no scenarios".to_string(),
            ));
        }
        for (name, partition) in &self.scenarios {
            partition.validate(name)?;
        }
        Ok(())
    }
}

impl Partition {
    fn validate(&self, name: &str) -> Result<(), InputError> {
        if self.test.is_empty() {
            return Err(InputError::InvalidInput(format!(
                "setting '{name}' has no test subjects"
            )));
        }
        let train: BTreeSet<&SubjectId> = self.train.iter().collect();
        let val: BTreeSet<&SubjectId> = self.val.iter().collect();
        let test: BTreeSet<&SubjectId> = self.test.iter().collect();

        for (a_name, a, b_name, b) in [
            ("train", &train, "val", &val),
            ("train", &train, "test", &test),
            ("val", &val, "test", &test),
        ] {
            if let Some(shared) = a.intersection(b).next() {
                return Err(InputError::InvalidInput(format!(
                    "setting '{name}': subject {shared} is in both {a_name} and {b_name}"
                )));
            }
        }

        for (group, members) in &self.test_groups {
            if let Some(outside) = members.iter().find(|s| !test.contains(s)) {
                return Err(InputError::InvalidInput(format!(
                    "setting '{name}': test group '{group}' subject {outside} is not a test subject"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/splits.rs"]
mod tests;
