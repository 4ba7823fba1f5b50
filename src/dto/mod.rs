pub mod calendar;
pub mod health;
pub mod report;
pub mod round;
pub mod sync;
pub mod validation;
