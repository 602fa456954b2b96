pub mod generate;
pub mod narrator;
pub mod session;
