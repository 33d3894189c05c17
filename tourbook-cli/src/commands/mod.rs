pub mod plan;
pub mod seed;
pub mod serve;
