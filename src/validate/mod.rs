pub mod check;
pub mod compare;
pub mod frame;
pub mod report;
