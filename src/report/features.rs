use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::input::InputError;
use crate::model::features::FeatureMatrix;

/// One row per chunk: `label` followed by the feature columns.
pub fn write_feature_tsv(matrix: &FeatureMatrix, path: &Path) -> Result<(), InputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| InputError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| InputError::io(path, e))?;
    let mut w = BufWriter::new(file);
    let mut write = || -> std::io::Result<()> {
        write!(w, "label")?;
        for name in &matrix.columns {
            write!(w, "\t{name}")?;
        }
        writeln!(w)?;
        for (row, label) in matrix.rows.iter().zip(&matrix.labels) {
            write!(w, "{label}")?;
            for v in row {
                write!(w, "\t{v:.6}")?;
            }
            writeln!(w)?;
        }
        w.flush()
    };
    write().map_err(|e| InputError::io(path, e))
}
