use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix given to files that do not receive a rank, so they can never keep a
/// bare numeric name.
pub const UNPLACED_PREFIX: char = 'z';

/// Scratch directory created inside the target directory while a plan is applied.
pub const STAGING_DIR_NAME: &str = ".tallyscan-staging";

/// Extension used for every ranked output, whatever the input format was.
pub const RANKED_EXTENSION: &str = "jpg";

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Two steps read the same file: {0}")]
    DuplicateSource(String),
    #[error("Rename target {target} collides with {existing}")]
    Collision { target: String, existing: String },
    #[error("Not a plain file name: {0:?}")]
    InvalidName(String),
    #[error("Staging directory {0} already exists; a previous run was interrupted")]
    StagingExists(PathBuf),
    #[error("Staging directory {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What reading one file produced, as far as planning is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketOutcome {
    Found(u64),
    NotFound,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    NoTicketNumber,
    ReadFailed { error: String },
    /// Another file with the same ticket number sorts first by name and was kept.
    DuplicateTicket { ticket: u64, kept: String },
}

impl fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnplacedReason::NoTicketNumber => write!(f, "no ticket number found"),
            UnplacedReason::ReadFailed { error } => write!(f, "read failed: {error}"),
            UnplacedReason::DuplicateTicket { ticket, kept } => {
                write!(f, "duplicate ticket No. {ticket} (kept {kept})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Ranked { rank: usize, ticket: u64 },
    Unplaced { reason: UnplacedReason },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameStep {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl fmt::Display for RenameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StepKind::Ranked { ticket, .. } => {
                write!(f, "{} -> {} (No. {ticket})", self.from, self.to)
            }
            StepKind::Unplaced { reason } => write!(f, "{} -> {} ({reason})", self.from, self.to),
        }
    }
}

/// The full set of renames for one directory, computed before anything moves.
#[derive(Debug, Clone, Serialize)]
pub struct RenamePlan {
    pub dir: PathBuf,
    pub steps: Vec<RenameStep>,
}

impl RenamePlan {
    /// Rank files by ticket number. Ranked files become `1.jpg, 2.jpg, …`;
    /// everything else gets the `z` prefix. On duplicate ticket numbers the
    /// file whose name sorts first keeps the rank.
    pub fn build(dir: &Path, outcomes: Vec<(String, TicketOutcome)>) -> Self {
        let mut found: Vec<(u64, String)> = Vec::new();
        let mut unplaced: Vec<(String, UnplacedReason)> = Vec::new();

        for (name, outcome) in outcomes {
            match outcome {
                TicketOutcome::Found(ticket) => found.push((ticket, name)),
                TicketOutcome::NotFound => unplaced.push((name, UnplacedReason::NoTicketNumber)),
                TicketOutcome::Failed(error) => {
                    unplaced.push((name, UnplacedReason::ReadFailed { error }))
                }
            }
        }

        found.sort();

        let mut steps = Vec::with_capacity(found.len() + unplaced.len());
        let mut last_kept: Option<(u64, String)> = None;
        for (ticket, name) in found {
            if let Some((kept_ticket, kept_name)) = &last_kept {
                if *kept_ticket == ticket {
                    unplaced.push((
                        name,
                        UnplacedReason::DuplicateTicket { ticket, kept: kept_name.clone() },
                    ));
                    continue;
                }
            }
            let rank = steps.len() + 1;
            steps.push(RenameStep {
                to: format!("{rank}.{RANKED_EXTENSION}"),
                from: name.clone(),
                kind: StepKind::Ranked { rank, ticket },
            });
            last_kept = Some((ticket, name));
        }

        unplaced.sort_by(|a, b| a.0.cmp(&b.0));
        steps.extend(unplaced.into_iter().map(|(name, reason)| RenameStep {
            to: format!("{UNPLACED_PREFIX}{name}"),
            from: name,
            kind: StepKind::Unplaced { reason },
        }));

        Self { dir: dir.to_path_buf(), steps }
    }

    pub fn ranked(&self) -> impl Iterator<Item = &RenameStep> {
        self.steps.iter().filter(|s| matches!(s.kind, StepKind::Ranked { .. }))
    }

    pub fn unplaced(&self) -> impl Iterator<Item = &RenameStep> {
        self.steps.iter().filter(|s| matches!(s.kind, StepKind::Unplaced { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// A plan whose sources and targets have been checked against each other and
/// against the directory contents.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    plan: RenamePlan,
}

impl ValidatedPlan {
    pub fn validate(plan: RenamePlan) -> Result<ValidatedPlan, PlanError> {
        let mut sources = HashSet::new();
        for step in &plan.steps {
            check_plain_name(&step.from)?;
            check_plain_name(&step.to)?;
            if !sources.insert(step.from.as_str()) {
                return Err(PlanError::DuplicateSource(step.from.clone()));
            }
        }

        let mut targets: HashSet<&str> = HashSet::new();
        for step in &plan.steps {
            if !targets.insert(step.to.as_str()) {
                return Err(PlanError::Collision {
                    target: step.to.clone(),
                    existing: "another planned rename".to_string(),
                });
            }
            // Sources are moved out of the way first, anything else is in the way.
            let occupied = plan.dir.join(&step.to).symlink_metadata().is_ok();
            if occupied && !sources.contains(step.to.as_str()) {
                return Err(PlanError::Collision {
                    target: step.to.clone(),
                    existing: "an existing file outside the plan".to_string(),
                });
            }
        }

        Ok(ValidatedPlan { plan })
    }

    pub fn plan(&self) -> &RenamePlan {
        &self.plan
    }

    /// Move every source into a staging directory, then from there to its target.
    /// Any failure rolls back the moves done so far. Returns the number of
    /// files renamed.
    pub fn apply(&self) -> Result<usize, PlanError> {
        if self.plan.is_empty() {
            return Ok(0);
        }
        let staging = self.plan.dir.join(STAGING_DIR_NAME);
        if staging.symlink_metadata().is_ok() {
            return Err(PlanError::StagingExists(staging));
        }
        fs::create_dir(&staging)
            .map_err(|source| PlanError::Staging { path: staging.clone(), source })?;

        let mut journal: Vec<(PathBuf, PathBuf)> = Vec::new();
        let result = self.stage_and_commit(&staging, &mut journal);
        if result.is_err() {
            rollback(&journal);
        }

        let cleanup = fs::remove_dir(&staging);
        result?;
        cleanup.map_err(|source| PlanError::Staging { path: staging, source })?;
        Ok(self.plan.steps.len())
    }

    fn stage_and_commit(
        &self,
        staging: &Path,
        journal: &mut Vec<(PathBuf, PathBuf)>,
    ) -> Result<(), PlanError> {
        // Staged entries are named by step index; the journal maps them back.
        let staged: Vec<PathBuf> =
            (0..self.plan.steps.len()).map(|i| staging.join(i.to_string())).collect();

        for (step, staged_path) in self.plan.steps.iter().zip(&staged) {
            move_file(&self.plan.dir.join(&step.from), staged_path, journal)?;
        }

        for (step, staged_path) in self.plan.steps.iter().zip(&staged) {
            move_file(staged_path, &self.plan.dir.join(&step.to), journal)?;
            tracing::info!("Renamed {step}");
        }
        Ok(())
    }
}

fn check_plain_name(name: &str) -> Result<(), PlanError> {
    let plain = Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
    if !plain || name == STAGING_DIR_NAME {
        return Err(PlanError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn move_file(
    from: &Path,
    to: &Path,
    journal: &mut Vec<(PathBuf, PathBuf)>,
) -> Result<(), PlanError> {
    fs::rename(from, to).map_err(|source| PlanError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })?;
    journal.push((from.to_path_buf(), to.to_path_buf()));
    Ok(())
}

fn rollback(journal: &[(PathBuf, PathBuf)]) {
    for (from, to) in journal.iter().rev() {
        if let Err(e) = fs::rename(to, from) {
            tracing::error!(
                "Rollback failed, {} left at {}: {e}",
                from.display(),
                to.display()
            );
        }
    }
}
