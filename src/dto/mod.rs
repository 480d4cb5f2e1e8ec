pub mod callable_dto;
pub mod event_dto;
