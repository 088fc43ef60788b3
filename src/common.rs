use std::fmt::Display;

use tracing::error;

/// Log if the result is an error
pub trait Logged {
    fn log(self) -> Self;
}

impl<T: Sized, E: Display> Logged for Result<T, E> {
    fn log(self) -> Self {
        match &self {
            Ok(_) => {}
            Err(e) => error!("{}", e),
        }
        self
    }
}
