pub mod currency;
pub mod dates;
pub mod error;

pub use currency::Currency;
pub use error::{AppError, Result};
