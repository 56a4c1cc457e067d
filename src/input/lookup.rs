use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::input::{InputError, SubjectId, open_maybe_gz};

const HEADER_SUBJECT: &str = "subject_id";
const HEADER_FOLDER: &str = "experiment_folder";

/// Subject to selected experiment directory, in table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupTable {
    entries: Vec<(SubjectId, PathBuf)>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, subject: SubjectId, dir: PathBuf) -> Result<(), InputError> {
        if self.entries.iter().any(|(s, _)| *s == subject) {
            return Err(InputError::InvalidInput(format!(
                "duplicate lookup entry for subject {subject}"
            )));
        }
        self.entries.push((subject, dir));
        Ok(())
    }

    pub fn experiment_dir(&self, subject: &SubjectId) -> Option<&Path> {
        self.entries
            .iter()
            .find(|(s, _)| s == subject)
            .map(|(_, p)| p.as_path())
    }

    pub fn subjects(&self) -> Vec<SubjectId> {
        self.entries.iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reads a `subject_id<TAB>experiment_folder` table. Relative folders are
    /// resolved against the table's own directory.
    pub fn read_tsv(path: &Path) -> Result<Self, InputError> {
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut reader = open_maybe_gz(path)?;
        let mut buf = String::new();

        let read = reader
            .read_line(&mut buf)
            .map_err(|e| InputError::io(path, e))?;
        if read == 0 {
            return Err(InputError::Parse(format!(
                "lookup table {} is empty",
                path.display()
            )));
        }
        let header: Vec<&str> = buf.trim_end().split('\t').map(str::trim).collect();
        let subject_col = header.iter().position(|h| *h == HEADER_SUBJECT);
        let folder_col = header.iter().position(|h| *h == HEADER_FOLDER);
        let (Some(subject_col), Some(folder_col)) = (subject_col, folder_col) else {
            return Err(InputError::Parse(format!(
                "lookup table {} needs '{}' and '{}' columns",
                path.display(),
                HEADER_SUBJECT,
                HEADER_FOLDER
            )));
        };

        let mut table = LookupTable::new();
        let mut seen = BTreeSet::new();
        let mut line_no = 1usize;
        loop {
            buf.clear();
            let read = reader
                .read_line(&mut buf)
                .map_err(|e| InputError::io(path, e))?;
            if read == 0 {
                break;
            }
            line_no += 1;
            let line = buf.trim_end();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            let (Some(subject), Some(folder)) = (fields.get(subject_col), fields.get(folder_col))
            else {
                return Err(InputError::Parse(format!(
                    "lookup table {} line {} is missing fields",
                    path.display(),
                    line_no
                )));
            };
            let subject = SubjectId::from_str(subject)?;
            if !seen.insert(subject.clone()) {
                return Err(InputError::InvalidInput(format!(
                    "lookup table {} line {}: duplicate subject {}",
                    path.display(),
                    line_no,
                    subject
                )));
            }
            let folder = PathBuf::from(folder);
            let dir = if folder.is_absolute() {
                folder
            } else {
                base.join(folder)
            };
            table.entries.push((subject, dir));
        }

        Ok(table)
    }

    pub fn write_tsv(&self, path: &Path) -> Result<(), InputError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| InputError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| InputError::io(path, e))?;
        let mut w = BufWriter::new(file);
        let mut write = || -> std::io::Result<()> {
            writeln!(w, "{HEADER_SUBJECT}\t{HEADER_FOLDER}")?;
            for (subject, dir) in &self.entries {
                writeln!(w, "{}\t{}", subject, dir.display())?;
            }
            w.flush()
        };
        write().map_err(|e| InputError::io(path, e))
    }
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/lookup.rs"]
mod tests;
