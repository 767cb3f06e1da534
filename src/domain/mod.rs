pub mod allocation;
pub mod break_days;
pub mod calendar;
pub mod carry_over;
pub mod models;
pub mod progress;
pub mod segments;
