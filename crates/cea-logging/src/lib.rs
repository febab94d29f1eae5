//! ---
//! cea_section: "03-persistence-logging"
//! cea_subsection: "module"
//! cea_type: "source"
//! cea_scope: "code"
//! cea_description: "Log context and evaluation lifecycle events."
//! cea_version: "v0.0.0-prealpha"
//! cea_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Context-carrying log macros so every solver event names the network,
//! building, time step, and element it concerns.

use tracing::Level;

pub mod macros;

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Network identifier associated with the log event.
    pub network: Option<&'a str>,
    /// Building identifier associated with the log event.
    pub building: Option<&'a str>,
    /// Simulated time step (hour of the horizon).
    pub time_step: Option<usize>,
    /// Node or edge identifier the event refers to.
    pub element: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a network identifier.
    pub fn with_network(mut self, network: &'a str) -> Self {
        self.network = Some(network);
        self
    }

    /// Attach a building identifier.
    pub fn with_building(mut self, building: &'a str) -> Self {
        self.building = Some(building);
        self
    }

    /// Attach a time step.
    pub fn with_time_step(mut self, time_step: usize) -> Self {
        self.time_step = Some(time_step);
        self
    }

    /// Attach a node or edge identifier.
    pub fn with_element(mut self, element: &'a str) -> Self {
        self.element = Some(element);
        self
    }
}

/// Outcome of one candidate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// The evaluation produced a trusted fitness vector.
    Success,
    /// The evaluation completed with flagged low-confidence steps.
    Degraded,
    /// The evaluation was aborted.
    Fault,
}

impl EvaluationOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            EvaluationOutcome::Success => "success",
            EvaluationOutcome::Degraded => "degraded",
            EvaluationOutcome::Fault => "fault",
        }
    }
}

/// Emit a standardized evaluation lifecycle event.
pub fn log_evaluation_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: EvaluationOutcome,
) {
    let default = LogContext::default();
    let ctx = context.unwrap_or(&default);
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                network = ctx.network.unwrap_or(""),
                building = ctx.building.unwrap_or(""),
                time_step = ctx.time_step.unwrap_or_default(),
                element = ctx.element.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        EvaluationOutcome::Success => emit!(Level::INFO),
        EvaluationOutcome::Degraded => emit!(Level::WARN),
        EvaluationOutcome::Fault => emit!(Level::ERROR),
    }
}
