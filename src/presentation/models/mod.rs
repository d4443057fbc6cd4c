use poem_openapi::Enum;

use crate::application::services::scheduler::SchedulerState;

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum SchedulerStateKind {
    #[oai(rename = "idle")]
    Idle,
    #[oai(rename = "running")]
    Running,
    #[oai(rename = "stopping")]
    Stopping,
}

impl From<SchedulerState> for SchedulerStateKind {
    fn from(value: SchedulerState) -> Self {
        match value {
            SchedulerState::Idle => SchedulerStateKind::Idle,
            SchedulerState::Running => SchedulerStateKind::Running,
            SchedulerState::Stopping => SchedulerStateKind::Stopping,
        }
    }
}
