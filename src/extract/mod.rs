pub mod category;
pub mod cycle;
pub mod dates;
pub mod platform;
pub mod price;
pub mod service;
pub mod trial;

pub use category::categorize;
pub use cycle::billing_cycle;
pub use platform::detect_platform;
pub use price::extract_price;
pub use trial::trial_info;
