pub mod call_timeout;
pub mod decimal_text;
pub mod time_utils;
