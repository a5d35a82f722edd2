pub mod api_dto;
