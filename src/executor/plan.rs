//! Migration plans
//!
//! A plan is an ordered list of steps, each applying or unapplying one
//! migration. Plans are computed against a ledger snapshot and contain no
//! no-op steps: forward steps are unapplied migrations, backward steps are
//! applied ones.

use std::fmt;

use serde::Serialize;

use crate::migration::MigrationId;

/// Where a run should leave the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every migration of every enabled app
    Latest,
    /// Every migration of one app, plus whatever those depend on
    AppLatest(String),
    /// Exactly the state after `id`: later same-app migrations are unapplied
    To(MigrationId),
    /// No migration of the app applied
    Zero(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Latest => write!(f, "latest"),
            Target::AppLatest(app) => write!(f, "{}.latest", app),
            Target::To(id) => write!(f, "{}", id),
            Target::Zero(app) => write!(f, "{}.zero", app),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub migration: MigrationId,
    pub direction: Direction,
}

impl PlanStep {
    pub fn forward(migration: MigrationId) -> Self {
        Self {
            migration,
            direction: Direction::Forward,
        }
    }

    pub fn backward(migration: MigrationId) -> Self {
        Self {
            migration,
            direction: Direction::Backward,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationPlan {
    steps: Vec<PlanStep>,
}

impl MigrationPlan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Ids of the steps going in `direction`, in plan order
    pub fn ids(&self, direction: Direction) -> Vec<&MigrationId> {
        self.steps
            .iter()
            .filter(|s| s.direction == direction)
            .map(|s| &s.migration)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display() {
        assert_eq!(Target::Latest.to_string(), "latest");
        assert_eq!(Target::Zero("video".into()).to_string(), "video.zero");
        assert_eq!(
            Target::To(MigrationId::new("video", "0003_alter_project_layers")).to_string(),
            "video.0003_alter_project_layers"
        );
    }

    #[test]
    fn test_step_serializes_direction_lowercase() {
        let step = PlanStep::backward(MigrationId::new("video", "0004_project_uuid"));
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["direction"], "backward");
        assert_eq!(value["migration"]["name"], "0004_project_uuid");
    }

    #[test]
    fn test_ids_by_direction() {
        let plan = MigrationPlan::new(vec![
            PlanStep::backward(MigrationId::new("video", "0004_project_uuid")),
            PlanStep::forward(MigrationId::new("video", "0002_project_created_at")),
        ]);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.ids(Direction::Forward).len(), 1);
        assert_eq!(plan.ids(Direction::Backward)[0].name, "0004_project_uuid");
    }
}
