pub mod api_client;
pub mod exec;
pub mod navigation;
pub mod pending;
pub mod proctor;
pub mod quiz;
pub mod timer;
