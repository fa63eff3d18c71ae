pub mod check;
pub mod connectors;
pub mod insert;
pub mod retrieve;
