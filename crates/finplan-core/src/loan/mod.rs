pub mod amortization;
pub mod analysis;
pub mod summary;
