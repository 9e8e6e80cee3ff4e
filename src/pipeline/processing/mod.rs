pub mod clean;
pub mod normalize;
pub mod parser;
pub mod ratings;
pub mod reconcile;
