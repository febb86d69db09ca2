//! Engine operations, grouped by concern.

mod admin;
mod betting;
mod liquidity;
mod settlement;
