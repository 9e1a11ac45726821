pub mod budget;
pub mod expand;
pub mod plane;
