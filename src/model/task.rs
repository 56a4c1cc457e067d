use clap::ValueEnum;
use serde::Serialize;

/// Workload levels recorded in the n-back protocol.
pub const MAX_WORKLOAD_LEVEL: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationTask {
    /// 0-back vs 2-back.
    Binary,
    /// 0-back, 1-back, 2-back and 3-back.
    FourClass,
}

impl ClassificationTask {
    pub fn n_classes(self) -> usize {
        match self {
            ClassificationTask::Binary => 2,
            ClassificationTask::FourClass => 4,
        }
    }

    pub fn class_names(self) -> &'static [&'static str] {
        match self {
            ClassificationTask::Binary => &["0back", "2back"],
            ClassificationTask::FourClass => &["0back", "1back", "2back", "3back"],
        }
    }

    /// Maps a recorded workload level to the class index of this task.
    /// `None` means the chunk is not part of the task.
    pub fn class_of_level(self, level: u32) -> Option<u32> {
        match self {
            ClassificationTask::Binary => match level {
                0 => Some(0),
                2 => Some(1),
                _ => None,
            },
            ClassificationTask::FourClass => (level <= MAX_WORKLOAD_LEVEL).then_some(level),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClassificationTask::Binary => "binary",
            ClassificationTask::FourClass => "four_class",
        }
    }
}
