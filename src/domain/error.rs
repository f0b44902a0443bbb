//! Per-record reconciliation failures and the diagnostics ledger.
//!
//! Nothing in here is pipeline-fatal. A record that fails to reconcile is
//! dropped (or one of its fields is degraded) and the reason is appended to
//! the diagnostics list that travels alongside every stage output.

use serde::Serialize;
use thiserror::Error;

/// Which upstream payload family a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    /// Gamma `/markets` metadata.
    Discovery,
    /// CLOB `/simplified-markets` tradable outcomes.
    Tradable,
    /// CLOB `/book` or `/prices`.
    Book,
    /// Data-API `/trades`.
    Trade,
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery => write!(f, "discovery"),
            Self::Tradable => write!(f, "tradable"),
            Self::Book => write!(f, "book"),
            Self::Trade => write!(f, "trade"),
        }
    }
}

/// Reason a record (or one of its fields) could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NormalizeError {
    #[error("missing required field `{field}`")]
    MissingRequiredField { field: &'static str },

    #[error("invalid numeric field `{field}`: {detail}")]
    InvalidNumericField { field: &'static str, detail: String },

    #[error("malformed outcome list in `{field}`: {detail}")]
    MalformedOutcomeList { field: &'static str, detail: String },

    #[error("outcome arity mismatch: {labels} labels, {tokens} tokens, {prices} prices")]
    OutcomeArityMismatch {
        labels: usize,
        tokens: usize,
        /// Zero when the payload carried no positional price array.
        prices: usize,
    },

    #[error("token `{token_id}` appears more than once in the market")]
    DuplicateTokenIdentifier { token_id: String },

    #[error("market has a tradable record but no outcomes")]
    EmptyOutcomeList,

    #[error("malformed {origin} record: {detail}")]
    MalformedRecord { origin: RecordSource, detail: String },

    #[error("duplicate {origin} record for the same identifier, last one kept")]
    DuplicateIdentifier { origin: RecordSource },
}

impl NormalizeError {
    /// Stable snake_case label, used for metrics and log fields.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MissingRequiredField { .. } => "missing_required_field",
            Self::InvalidNumericField { .. } => "invalid_numeric_field",
            Self::MalformedOutcomeList { .. } => "malformed_outcome_list",
            Self::OutcomeArityMismatch { .. } => "outcome_arity_mismatch",
            Self::DuplicateTokenIdentifier { .. } => "duplicate_token_identifier",
            Self::EmptyOutcomeList => "empty_outcome_list",
            Self::MalformedRecord { .. } => "malformed_record",
            Self::DuplicateIdentifier { .. } => "duplicate_identifier",
        }
    }

    pub(crate) fn invalid_numeric(field: &'static str, detail: impl Into<String>) -> Self {
        Self::InvalidNumericField {
            field,
            detail: detail.into(),
        }
    }

    pub(crate) fn malformed_list(field: &'static str, detail: impl Into<String>) -> Self {
        Self::MalformedOutcomeList {
            field,
            detail: detail.into(),
        }
    }
}

/// What the pipeline did with the record that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticAction {
    /// The whole record was excluded from the output.
    Skipped,
    /// Two records shared an identifier; the later one replaced the earlier.
    Merged,
    /// The record was kept but one field was left unset.
    Degraded,
}

impl DiagnosticAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Merged => "merged",
            Self::Degraded => "degraded",
        }
    }
}

/// One entry of the diagnostics ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Market identifier, or the best available key when none could be read.
    pub identifier: String,
    /// Token the diagnostic is scoped to, if narrower than the market.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    pub action: DiagnosticAction,
    pub reason: NormalizeError,
}

impl Diagnostic {
    pub fn skipped(identifier: impl Into<String>, reason: NormalizeError) -> Self {
        Self {
            identifier: identifier.into(),
            token_id: None,
            action: DiagnosticAction::Skipped,
            reason,
        }
    }

    pub fn merged(identifier: impl Into<String>, source: RecordSource) -> Self {
        Self {
            identifier: identifier.into(),
            token_id: None,
            action: DiagnosticAction::Merged,
            reason: NormalizeError::DuplicateIdentifier { origin: source },
        }
    }

    pub fn degraded(
        identifier: impl Into<String>,
        token_id: impl Into<String>,
        reason: NormalizeError,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            token_id: Some(token_id.into()),
            action: DiagnosticAction::Degraded,
            reason,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.token_id {
            Some(token) => write!(
                f,
                "[{}] {}/{}: {}",
                self.action.label(),
                self.identifier,
                token,
                self.reason
            ),
            None => write!(f, "[{}] {}: {}", self.action.label(), self.identifier, self.reason),
        }
    }
}

/// A stage output paired with the diagnostics accumulated producing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> Reconciled<T> {
    pub const fn new(value: T, diagnostics: Vec<Diagnostic>) -> Self {
        Self { value, diagnostics }
    }

    /// Split into the value and its diagnostics.
    pub fn into_parts(self) -> (T, Vec<Diagnostic>) {
        (self.value, self.diagnostics)
    }

    /// Count of diagnostics with the given action.
    pub fn count(&self, action: DiagnosticAction) -> usize {
        self.diagnostics.iter().filter(|d| d.action == action).count()
    }
}
