use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinPlanError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error(
        "Non-amortizing installment in month {month}{}: the installment does not exceed the monthly interest",
        prepayment_id.as_ref().map(|id| format!(" (prepayment '{id}')")).unwrap_or_default()
    )]
    NonAmortizingInstallment {
        month: u32,
        prepayment_id: Option<String>,
    },

    #[error("Goal unreachable: target {target} not met even at the contribution ceiling {ceiling} (best corpus: {best_corpus})")]
    GoalUnreachable {
        target: Decimal,
        ceiling: Decimal,
        best_corpus: Decimal,
    },

    #[error("Numeric overflow in {context}: values exceed the decimal range")]
    NumericOverflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FinPlanError {
    pub(crate) fn overflow(context: &str) -> Self {
        FinPlanError::NumericOverflow {
            context: context.to_string(),
        }
    }
}

impl From<serde_json::Error> for FinPlanError {
    fn from(e: serde_json::Error) -> Self {
        FinPlanError::SerializationError(e.to_string())
    }
}
