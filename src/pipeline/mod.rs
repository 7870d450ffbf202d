//! Sequential stage execution.
//!
//! Stages run one after another. A stage whose probe reports it already
//! satisfied is skipped. The first failure halts the run and its stage's
//! reserved code becomes the exit code; nothing is rolled back.

pub mod context;
pub mod exit_codes;

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::facts::EnvironmentFacts;
use crate::log::RunLog;
use crate::timing::Timer;
use crate::verdict::{Failure, Verdict};

pub use context::RunContext;

pub const TAG: &str = "pipeline";

/// One named unit of the pipeline.
pub trait Stage {
    fn name(&self) -> &str;

    /// Reserved, non-zero exit code reported when this stage fails.
    fn exit_code(&self) -> u8;

    /// One-line description for `show stages`.
    fn purpose(&self) -> &str {
        ""
    }

    /// True if the stage's effect is already in place. May record outputs
    /// into `ctx` so later stages see them even when this one is skipped.
    fn is_satisfied(&self, _facts: &EnvironmentFacts, _ctx: &mut RunContext) -> bool {
        false
    }

    fn run(&self, facts: &EnvironmentFacts, ctx: &mut RunContext, log: &mut RunLog) -> Verdict;
}

type SatisfiedFn = Box<dyn Fn(&EnvironmentFacts, &mut RunContext) -> bool>;
type RunFn = Box<dyn Fn(&EnvironmentFacts, &mut RunContext, &mut RunLog) -> Verdict>;

/// A stage built from closures.
pub struct FnStage {
    name: String,
    exit_code: u8,
    satisfied: Option<SatisfiedFn>,
    run: RunFn,
}

impl FnStage {
    pub fn new(
        name: impl Into<String>,
        exit_code: u8,
        run: impl Fn(&EnvironmentFacts, &mut RunContext, &mut RunLog) -> Verdict + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            exit_code,
            satisfied: None,
            run: Box::new(run),
        }
    }

    pub fn satisfied_when(
        mut self,
        probe: impl Fn(&EnvironmentFacts, &mut RunContext) -> bool + 'static,
    ) -> Self {
        self.satisfied = Some(Box::new(probe));
        self
    }
}

impl Stage for FnStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn exit_code(&self) -> u8 {
        self.exit_code
    }

    fn is_satisfied(&self, facts: &EnvironmentFacts, ctx: &mut RunContext) -> bool {
        self.satisfied.as_ref().is_some_and(|probe| probe(facts, ctx))
    }

    fn run(&self, facts: &EnvironmentFacts, ctx: &mut RunContext, log: &mut RunLog) -> Verdict {
        (self.run)(facts, ctx, log)
    }
}

/// What happened during a run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub exit_code: u8,
    pub failed_stage: Option<String>,
    pub failure: Option<Failure>,
    pub context: RunContext,
    /// Stages whose run function was called, in order.
    pub ran: Vec<String>,
    /// Stages skipped because they were already satisfied.
    pub skipped: Vec<String>,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        self.exit_code == exit_codes::SUCCESS
    }

    /// Outcome for a run that failed before any stage started.
    pub fn aborted(exit_code: u8, failure: Failure) -> Self {
        Self {
            exit_code,
            failed_stage: None,
            failure: Some(failure),
            context: RunContext::new(),
            ran: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| (s.name(), s.exit_code())))
            .finish()
    }
}

impl Pipeline {
    /// Validate and build. Names and exit codes must be unique, and no stage may
    /// use a code the runner reports itself (0, 1, 10).
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self> {
        let mut names = HashSet::new();
        let mut codes = HashSet::new();
        for stage in &stages {
            if exit_codes::RUNNER_CODES.contains(&stage.exit_code()) {
                return Err(Error::InvalidPipeline(format!(
                    "stage '{}' uses exit code {}, which is reserved for {}",
                    stage.name(),
                    stage.exit_code(),
                    exit_codes::describe(stage.exit_code()).unwrap_or("the runner")
                )));
            }
            if !names.insert(stage.name().to_string()) {
                return Err(Error::InvalidPipeline(format!(
                    "duplicate stage name '{}'",
                    stage.name()
                )));
            }
            if !codes.insert(stage.exit_code()) {
                return Err(Error::InvalidPipeline(format!(
                    "exit code {} used by more than one stage (again by '{}')",
                    stage.exit_code(),
                    stage.name()
                )));
            }
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> impl Iterator<Item = &dyn Stage> {
        self.stages.iter().map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn execute(&self, facts: &EnvironmentFacts, log: &mut RunLog) -> PipelineOutcome {
        let mut ctx = RunContext::new();
        let mut ran = Vec::new();
        let mut skipped = Vec::new();
        let total = self.stages.len();

        for (index, stage) in self.stages.iter().enumerate() {
            let name = stage.name();

            if stage.is_satisfied(facts, &mut ctx) {
                log.info(name, "already satisfied, skipping");
                skipped.push(name.to_string());
                continue;
            }

            log.info(name, format!("starting (stage {}/{})", index + 1, total));
            let timer = Timer::start(name);
            ran.push(name.to_string());
            let verdict = stage.run(facts, &mut ctx, log);
            let (_, label) = timer.finish();

            match verdict {
                Verdict::Success => log.info(name, format!("completed {}", label)),
                Verdict::Failure(failure) => {
                    log.error(name, format!("stage failed: {}", failure));
                    log.error(
                        TAG,
                        format!(
                            "halted at {} with exit code {} ({})",
                            name,
                            stage.exit_code(),
                            failure.cause.class()
                        ),
                    );
                    return PipelineOutcome {
                        exit_code: stage.exit_code(),
                        failed_stage: Some(name.to_string()),
                        failure: Some(failure),
                        context: ctx,
                        ran,
                        skipped,
                    };
                }
            }
        }

        log.info(TAG, "pipeline completed successfully");
        PipelineOutcome {
            exit_code: exit_codes::SUCCESS,
            failed_stage: None,
            failure: None,
            context: ctx,
            ran,
            skipped,
        }
    }
}
