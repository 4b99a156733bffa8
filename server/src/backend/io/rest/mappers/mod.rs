pub mod birthday_mapper;
pub mod reminder_mapper;
