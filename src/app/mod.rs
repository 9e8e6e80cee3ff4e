pub mod etl_use_case;

pub use etl_use_case::{EtlInputs, EtlUseCase, RunReport, Stage, StageReport, StageStatus};
