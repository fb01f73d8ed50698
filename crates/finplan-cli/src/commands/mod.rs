pub mod loan;
pub mod sip;
