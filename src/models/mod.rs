pub mod meal_type;
pub mod preference;
pub mod sleep_diary;
pub mod sleep_record;
pub mod sleep_state;
