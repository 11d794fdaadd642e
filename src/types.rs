use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a financing contract
pub type ContractId = Uuid;

/// unique identifier for an installment row
pub type InstallmentId = Uuid;

/// amortization method used to generate a schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AmortizationMethod {
    /// flat interest on the full principal, folded into equal capital installments ("credito directo")
    Linear,
    /// annuity: constant total payment, growing capital portion
    Frances,
    /// constant capital portion, interest on the declining balance
    Aleman,
}

impl fmt::Display for AmortizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AmortizationMethod::Linear => "LINEAR",
            AmortizationMethod::Frances => "FRANCES",
            AmortizationMethod::Aleman => "ALEMAN",
        };
        f.write_str(name)
    }
}

/// payment state of a single installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    /// nothing collected yet
    #[default]
    Pendiente,
    /// something collected, balance still open
    Parcial,
    /// balance settled within tolerance
    Pagado,
}
