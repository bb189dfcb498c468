pub mod balance;
pub mod benchmark;
pub mod pnl;
pub mod position;
pub mod quote;
pub mod transaction;
