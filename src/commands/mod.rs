pub mod cases;
pub mod doctor;
pub mod executions;
pub mod groups;
