pub mod hours;
pub mod schedules;
