//! Status codes
//!
//! Every driver returns `Result<T, E>` where `E` is that peripheral's error
//! enum. `Ok` is the peripheral's `*_OK` status (code 0); each error variant
//! names one class of invalid configuration and carries a fixed negative
//! code, so results can be handed across a C-style boundary unchanged.

/// Numeric code of a successful call
pub const STATUS_OK: i16 = 0;

/// Error enums with a stable numeric status code
pub trait StatusCode: Copy {
    /// Negative status code of this error
    fn code(&self) -> i16;
}

/// Collapse a driver result into its numeric status code
#[must_use]
pub fn status<T, E: StatusCode>(result: &Result<T, E>) -> i16 {
    match result {
        Ok(_) => STATUS_OK,
        Err(e) => e.code(),
    }
}

/// Declare a peripheral error enum with status codes and messages
macro_rules! status_codes {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $msg:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "embedded", derive(defmt::Format))]
        #[repr(i16)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant = $code, )+
        }

        impl $crate::error::StatusCode for $name {
            fn code(&self) -> i16 {
                *self as i16
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let msg = match self {
                    $( Self::$variant => $msg, )+
                };
                write!(f, "{msg} ({})", *self as i16)
            }
        }
    };
}
