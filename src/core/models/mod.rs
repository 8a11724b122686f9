pub mod audit;
pub mod expense;
pub mod group;
pub mod group_expense;
pub mod settlement;
pub mod user;
