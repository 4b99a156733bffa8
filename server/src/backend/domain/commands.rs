//! Domain-level command and query types
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the public DTOs defined in
//! the `shared` crate to these internal types.

pub mod birthday {
    use crate::backend::domain::models::birthday::Birthday;
    use crate::backend::domain::recurrence::Recurrence;
    use chrono::NaiveDate;

    /// Input for creating a new birthday.
    #[derive(Debug, Clone)]
    pub struct CreateBirthdayCommand {
        pub name: String,
        pub date: String,
        pub is_lunar: bool,
        pub reminder_days_before: u32,
        pub enabled: bool,
        pub relationship: String,
        pub notes: String,
    }

    /// Partial update; `None` leaves a field unchanged.
    #[derive(Debug, Clone, Default)]
    pub struct UpdateBirthdayCommand {
        pub id: u64,
        pub name: Option<String>,
        pub date: Option<String>,
        pub is_lunar: Option<bool>,
        pub reminder_days_before: Option<u32>,
        pub enabled: Option<bool>,
        pub relationship: Option<String>,
        pub notes: Option<String>,
    }

    /// Ids in their new display order.
    #[derive(Debug, Clone)]
    pub struct ReorderBirthdaysCommand {
        pub birthday_ids: Vec<u64>,
    }

    #[derive(Debug, Clone)]
    pub struct BirthdayResult {
        pub birthday: Birthday,
        pub success_message: String,
    }

    /// A birthday with the next date it falls on.
    #[derive(Debug, Clone)]
    pub struct UpcomingBirthday {
        pub birthday: Birthday,
        pub recurrence: Recurrence,
        pub turning_age: i32,
        pub within_reminder_window: bool,
    }

    #[derive(Debug, Clone)]
    pub struct UpcomingBirthdaysResult {
        pub today: NaiveDate,
        pub upcoming: Vec<UpcomingBirthday>,
    }
}
