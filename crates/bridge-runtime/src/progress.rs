//! Initialization progress model (spec §6): published to the UI
//! collaborator as `{current_step, status, start_time, elapsed,
//! step_infos[]}`. The orchestrator drives this through seven ordered
//! steps; a failed step is recorded but does not abort the sequence — the
//! pipeline continues in degraded mode.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    Console,
    Engine,
    Watchers,
    DesktopClient,
    MobileClient,
    ParameterSync,
    FinalSetup,
}

impl InitStep {
    pub const ORDER: [InitStep; 7] = [
        InitStep::Console,
        InitStep::Engine,
        InitStep::Watchers,
        InitStep::DesktopClient,
        InitStep::MobileClient,
        InitStep::ParameterSync,
        InitStep::FinalSetup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Console => "Console",
            Self::Engine => "Engine",
            Self::Watchers => "Watchers",
            Self::DesktopClient => "DesktopClient",
            Self::MobileClient => "MobileClient",
            Self::ParameterSync => "ParameterSync",
            Self::FinalSetup => "FinalSetup",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct StepInfo {
    pub step: InitStep,
    pub status: StepStatus,
    pub elapsed: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct InitProgress {
    pub current_step: InitStep,
    pub status: StepStatus,
    pub start_time: Instant,
    pub elapsed: Duration,
    pub step_infos: Vec<StepInfo>,
}

impl InitProgress {
    pub fn new() -> Self {
        let start_time = Instant::now();
        Self {
            current_step: InitStep::Console,
            status: StepStatus::Pending,
            start_time,
            elapsed: Duration::ZERO,
            step_infos: InitStep::ORDER
                .iter()
                .map(|&step| StepInfo {
                    step,
                    status: StepStatus::Pending,
                    elapsed: None,
                })
                .collect(),
        }
    }

    fn info_mut(&mut self, step: InitStep) -> &mut StepInfo {
        self.step_infos
            .iter_mut()
            .find(|i| i.step == step)
            .expect("InitStep::ORDER covers every step")
    }

    pub fn begin(&mut self, step: InitStep) {
        self.current_step = step;
        self.status = StepStatus::InProgress;
        self.elapsed = self.start_time.elapsed();
        self.info_mut(step).status = StepStatus::InProgress;
    }

    pub fn complete(&mut self, step: InitStep, started: Instant) {
        self.status = StepStatus::Completed;
        self.elapsed = self.start_time.elapsed();
        let info = self.info_mut(step);
        info.status = StepStatus::Completed;
        info.elapsed = Some(started.elapsed());
    }

    pub fn fail(&mut self, step: InitStep, started: Instant, reason: String) {
        self.status = StepStatus::Failed(reason.clone());
        self.elapsed = self.start_time.elapsed();
        let info = self.info_mut(step);
        info.status = StepStatus::Failed(reason);
        info.elapsed = Some(started.elapsed());
    }
}

impl Default for InitProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_every_step_pending() {
        let progress = InitProgress::new();
        assert_eq!(progress.step_infos.len(), 7);
        assert!(progress
            .step_infos
            .iter()
            .all(|i| i.status == StepStatus::Pending));
    }

    #[test]
    fn a_failed_step_does_not_clear_other_step_infos() {
        let mut progress = InitProgress::new();
        progress.begin(InitStep::DesktopClient);
        progress.fail(InitStep::DesktopClient, Instant::now(), "connect refused".to_string());
        assert_eq!(progress.step_infos.len(), 7);
        let desktop = progress
            .step_infos
            .iter()
            .find(|i| i.step == InitStep::DesktopClient)
            .unwrap();
        assert!(matches!(desktop.status, StepStatus::Failed(_)));
    }

    #[test]
    fn steps_run_in_the_documented_order() {
        assert_eq!(
            InitStep::ORDER.map(InitStep::as_str),
            [
                "Console",
                "Engine",
                "Watchers",
                "DesktopClient",
                "MobileClient",
                "ParameterSync",
                "FinalSetup",
            ]
        );
    }
}
