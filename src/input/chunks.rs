use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::input::{InputError, SubjectId, open_maybe_gz};
use crate::model::task::{ClassificationTask, MAX_WORKLOAD_LEVEL};

/// fNIRS channel columns per recording row.
pub const FNIRS_CHANNELS: usize = 8;

const CHUNK_COLUMN: &str = "chunk";
const LABEL_COLUMN: &str = "label";

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: u64,
    pub label: u32,
    /// Row-major `window_size x n_channels`.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkSet {
    pub window_size: usize,
    pub channels: Vec<String>,
    pub chunks: Vec<Chunk>,
}

impl ChunkSet {
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn labels(&self) -> Vec<u32> {
        self.chunks.iter().map(|c| c.label).collect()
    }

    /// First half (adaptation portion) and second half (held-out portion) in
    /// recording order. An odd chunk goes to the held-out half.
    pub fn split_halves(&self) -> (ChunkSet, ChunkSet) {
        let half = self.chunks.len() / 2;
        let first = ChunkSet {
            window_size: self.window_size,
            channels: self.channels.clone(),
            chunks: self.chunks[..half].to_vec(),
        };
        let second = ChunkSet {
            window_size: self.window_size,
            channels: self.channels.clone(),
            chunks: self.chunks[half..].to_vec(),
        };
        (first, second)
    }

    /// Column `channel` of one chunk across the window.
    pub fn channel_series(&self, chunk: &Chunk, channel: usize) -> Vec<f64> {
        let n = self.n_channels();
        (0..self.window_size)
            .map(|t| chunk.values[t * n + channel])
            .collect()
    }
}

pub fn subject_csv_path(data_dir: &Path, subject: &SubjectId) -> PathBuf {
    let plain = data_dir.join(format!("sub_{subject}.csv"));
    if plain.exists() {
        return plain;
    }
    let gz = data_dir.join(format!("sub_{subject}.csv.gz"));
    if gz.exists() { gz } else { plain }
}

/// Chunk reader bound to one classification task and window size.
#[derive(Debug, Clone, Copy)]
pub struct ChunkLoader {
    task: ClassificationTask,
    window_size: usize,
}

impl ChunkLoader {
    pub fn for_task(task: ClassificationTask, window_size: usize) -> Self {
        Self { task, window_size }
    }

    pub fn task(&self) -> ClassificationTask {
        self.task
    }

    pub fn load(&self, path: &Path) -> Result<ChunkSet, InputError> {
        let all = read_chunk_csv(path, self.window_size)?;
        let total = all.chunks.len();
        let mut chunks = Vec::with_capacity(total);
        for mut chunk in all.chunks {
            if let Some(class) = self.task.class_of_level(chunk.label) {
                chunk.label = class;
                chunks.push(chunk);
            }
        }
        tracing::debug!(
            path = %path.display(),
            task = self.task.name(),
            kept = chunks.len(),
            total,
            "loaded subject chunks"
        );
        if chunks.is_empty() {
            return Err(InputError::InvalidInput(format!(
                "{} has no chunks for the {} task",
                path.display(),
                self.task.name()
            )));
        }
        Ok(ChunkSet {
            window_size: all.window_size,
            channels: all.channels,
            chunks,
        })
    }
}

/// Reads a windowed subject recording. Rows of one chunk must be consecutive,
/// share a label and number exactly `window_size`.
pub fn read_chunk_csv(path: &Path, window_size: usize) -> Result<ChunkSet, InputError> {
    if window_size == 0 {
        return Err(InputError::InvalidInput(
            "window size must be positive".to_string(),
        ));
    }
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();

    let read = reader
        .read_line(&mut buf)
        .map_err(|e| InputError::io(path, e))?;
    if read == 0 {
        return Err(InputError::Parse(format!("{} is empty", path.display())));
    }
    let header: Vec<String> = buf
        .trim_end()
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .collect();

    let chunk_col = find_column(&header, CHUNK_COLUMN, path)?;
    let label_col = find_column(&header, LABEL_COLUMN, path)?;
    let channel_cols: Vec<usize> = (0..header.len())
        .filter(|&i| i != chunk_col && i != label_col)
        .collect();
    if channel_cols.len() != FNIRS_CHANNELS {
        return Err(InputError::InvalidInput(format!(
            "{}: expected {} channel columns, found {}",
            path.display(),
            FNIRS_CHANNELS,
            channel_cols.len()
        )));
    }
    let channels = channel_cols.iter().map(|&i| header[i].clone()).collect();

    let mut chunks: Vec<Chunk> = Vec::new();
    let mut seen_ids: HashSet<u64> = HashSet::new();
    let mut rows_in_current = 0usize;
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
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != header.len() {
            return Err(InputError::Parse(format!(
                "{} line {}: expected {} fields, found {}",
                path.display(),
                line_no,
                header.len(),
                fields.len()
            )));
        }

        let chunk_id: u64 = parse_field(fields[chunk_col], CHUNK_COLUMN, path, line_no)?;
        let label: u32 = parse_field(fields[label_col], LABEL_COLUMN, path, line_no)?;
        if label > MAX_WORKLOAD_LEVEL {
            return Err(InputError::InvalidInput(format!(
                "{} line {}: workload level {} out of range",
                path.display(),
                line_no,
                label
            )));
        }

        let starts_new = chunks.last().is_none_or(|c| c.id != chunk_id);
        if starts_new {
            if let Some(prev) = chunks.last() {
                check_complete(prev, rows_in_current, window_size, path)?;
            }
            if !seen_ids.insert(chunk_id) {
                return Err(InputError::Parse(format!(
                    "{} line {}: rows of chunk {} are not consecutive",
                    path.display(),
                    line_no,
                    chunk_id
                )));
            }
            chunks.push(Chunk {
                id: chunk_id,
                label,
                values: Vec::with_capacity(window_size * FNIRS_CHANNELS),
            });
            rows_in_current = 0;
        }

        let Some(current) = chunks.last_mut() else {
            continue;
        };
        if current.label != label {
            return Err(InputError::InvalidInput(format!(
                "{} line {}: chunk {} changes label",
                path.display(),
                line_no,
                chunk_id
            )));
        }
        if rows_in_current == window_size {
            return Err(InputError::InvalidInput(format!(
                "{} line {}: chunk {} exceeds window size {}",
                path.display(),
                line_no,
                chunk_id,
                window_size
            )));
        }
        for &col in &channel_cols {
            let v: f64 = parse_field(fields[col], &header[col], path, line_no)?;
            current.values.push(v);
        }
        rows_in_current += 1;
    }

    match chunks.last() {
        Some(last) => check_complete(last, rows_in_current, window_size, path)?,
        None => {
            return Err(InputError::Parse(format!(
                "{} has no data rows",
                path.display()
            )));
        }
    }

    Ok(ChunkSet {
        window_size,
        channels,
        chunks,
    })
}

fn find_column(header: &[String], name: &str, path: &Path) -> Result<usize, InputError> {
    header.iter().position(|h| h == name).ok_or_else(|| {
        InputError::MissingInput(format!("{}: no '{}' column", path.display(), name))
    })
}

fn check_complete(
    chunk: &Chunk,
    rows: usize,
    window_size: usize,
    path: &Path,
) -> Result<(), InputError> {
    if rows != window_size {
        return Err(InputError::InvalidInput(format!(
            "{}: chunk {} has {} rows, expected {}",
            path.display(),
            chunk.id,
            rows,
            window_size
        )));
    }
    Ok(())
}

fn parse_field<T: std::str::FromStr>(
    raw: &str,
    column: &str,
    path: &Path,
    line_no: usize,
) -> Result<T, InputError> {
    raw.parse::<T>().map_err(|_| {
        InputError::Parse(format!(
            "{} line {}: invalid {} value '{}'",
            path.display(),
            line_no,
            column,
            raw
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/chunks.rs"]
mod tests;
