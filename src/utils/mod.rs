pub mod email_filter;
pub mod profile_cache;
pub mod time;
pub mod validation;
