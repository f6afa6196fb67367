pub mod bank;
pub mod clock;
pub mod engine;
pub mod scheduler;
pub mod sequence;
