pub mod test_utils;
pub mod timezone;

pub use timezone::TimezoneResolver;
