pub mod category_service;
pub mod contact_service;
pub mod sms_log_service;
pub mod user_service;
