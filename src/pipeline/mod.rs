pub mod stage1_select;
pub mod stage2_bootstrap;
pub mod stage3_report;
