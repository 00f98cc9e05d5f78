//! Amortization module - schedule models and the level-payment calculator.

mod amortization_calculator;
mod amortization_model;


pub use amortization_calculator::{
    generate_schedule, generate_schedule_with_terms, level_payment, preview_schedule,
};
pub use amortization_model::{SchedulePreview, ScheduleRow, ScheduleSummary, ScheduleTerms};
