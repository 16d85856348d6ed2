use serde::Serialize;

/// Result of a non-fatal stage. Fatal stages return `Err` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Complete(T),
    /// The stage produced a placeholder or partial value; `reason` says why.
    Degraded { value: T, reason: String },
}

impl<T> StageOutcome<T> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        StageOutcome::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            StageOutcome::Complete(v) | StageOutcome::Degraded { value: v, .. } => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            StageOutcome::Complete(v) | StageOutcome::Degraded { value: v, .. } => v,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, StageOutcome::Degraded { .. })
    }

    pub fn status(&self) -> StageStatus {
        match self {
            StageOutcome::Complete(_) => StageStatus::Complete,
            StageOutcome::Degraded { reason, .. } => StageStatus::Degraded {
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Complete,
    Degraded { reason: String },
    Skipped { reason: String },
}

/// Per-stage statuses for one run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub stages: Vec<(&'static str, StageStatus)>,
}

impl RunReport {
    pub fn record<T>(&mut self, stage: &'static str, outcome: &StageOutcome<T>) {
        if let StageOutcome::Degraded { reason, .. } = outcome {
            tracing::warn!(stage, reason = %reason, "stage degraded");
        }
        self.stages.push((stage, outcome.status()));
    }

    pub fn complete(&mut self, stage: &'static str) {
        self.stages.push((stage, StageStatus::Complete));
    }

    pub fn skipped(&mut self, stage: &'static str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(stage, reason = %reason, "stage skipped");
        self.stages.push((stage, StageStatus::Skipped { reason }));
    }

    pub fn status_of(&self, stage: &str) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, s)| s)
    }

    pub fn degraded_count(&self) -> usize {
        self.stages
            .iter()
            .filter(|(_, s)| matches!(s, StageStatus::Degraded { .. }))
            .count()
    }
}
