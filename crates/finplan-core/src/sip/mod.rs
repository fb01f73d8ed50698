pub mod goal;
pub mod planner;
pub mod projection;
pub mod xirr;
