pub mod movegen;
pub mod tables;
