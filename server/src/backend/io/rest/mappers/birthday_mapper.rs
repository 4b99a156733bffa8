use crate::backend::domain::calendar::format_iso_date;
use crate::backend::domain::lunar::lunar_display_name;
use crate::backend::domain::commands::birthday::{
    BirthdayResult, CreateBirthdayCommand, UpcomingBirthdaysResult, UpdateBirthdayCommand,
};
use crate::backend::domain::models::birthday::Birthday as DomainBirthday;
use shared::{
    Birthday as SharedBirthday, BirthdayListResponse, BirthdayResponse, CreateBirthdayRequest,
    UpcomingBirthday, UpcomingBirthdaysResponse, UpdateBirthdayRequest,
};

/// Mapper to convert between shared Birthday DTOs and domain Birthday models.
pub struct BirthdayMapper;

impl BirthdayMapper {
    pub fn to_dto(domain: DomainBirthday) -> SharedBirthday {
        let lunar_label = domain
            .calendar_date
            .is_lunar
            .then(|| lunar_display_name(domain.calendar_date.month, domain.calendar_date.day));
        SharedBirthday {
            id: domain.id,
            name: domain.name,
            date: domain.calendar_date.format(),
            is_lunar: domain.calendar_date.is_lunar,
            reminder_days_before: domain.reminder_days_before,
            enabled: domain.enabled,
            relationship: domain.relationship,
            notes: domain.notes,
            sort_order: domain.sort_order,
            created_at: domain.created_at.to_rfc3339(),
            lunar_label,
        }
    }

    pub fn to_list_response(domain_birthdays: Vec<DomainBirthday>) -> BirthdayListResponse {
        BirthdayListResponse {
            birthdays: domain_birthdays.into_iter().map(Self::to_dto).collect(),
        }
    }

    pub fn to_response(result: BirthdayResult) -> BirthdayResponse {
        BirthdayResponse {
            birthday: Self::to_dto(result.birthday),
            success_message: result.success_message,
        }
    }

    pub fn to_create_command(request: CreateBirthdayRequest) -> CreateBirthdayCommand {
        CreateBirthdayCommand {
            name: request.name,
            date: request.date,
            is_lunar: request.is_lunar,
            reminder_days_before: request.reminder_days_before,
            enabled: request.enabled,
            relationship: request.relationship,
            notes: request.notes,
        }
    }

    pub fn to_update_command(id: u64, request: UpdateBirthdayRequest) -> UpdateBirthdayCommand {
        UpdateBirthdayCommand {
            id,
            name: request.name,
            date: request.date,
            is_lunar: request.is_lunar,
            reminder_days_before: request.reminder_days_before,
            enabled: request.enabled,
            relationship: request.relationship,
            notes: request.notes,
        }
    }

    pub fn to_upcoming_response(result: UpcomingBirthdaysResult) -> UpcomingBirthdaysResponse {
        UpcomingBirthdaysResponse {
            today: format_iso_date(result.today),
            upcoming: result
                .upcoming
                .into_iter()
                .map(|entry| UpcomingBirthday {
                    birthday: Self::to_dto(entry.birthday),
                    next_occurrence: format_iso_date(entry.recurrence.next_occurrence),
                    days_until: entry.recurrence.days_until,
                    turning_age: entry.turning_age,
                    within_reminder_window: entry.within_reminder_window,
                })
                .collect(),
        }
    }
}
