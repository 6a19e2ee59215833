//! Configuration Validators
//!
//! Every hardware field with a fixed set of legal encodings is a closed
//! enum declared with `config_enum!`. The macro generates:
//!
//! - `raw()`: the register encoding of a member
//! - `TryFrom<u32>`: the validator, returning the field's specific
//!   `Invalid*` error for anything outside the domain
//! - a [`Domain`] impl listing every member
//!
//! Checks that span several fields (a burst size against a FIFO threshold,
//! a duty cycle against a bus speed) sit next to the driver that commits
//! them and run before the first register write.

/// A closed set of legal encodings for one hardware field
pub trait Domain: Copy + PartialEq + TryFrom<u32> + 'static {
    /// Every member, in declaration order
    const ALL: &'static [Self];

    /// Register encoding of this member
    fn encoding(self) -> u32;
}

/// Validate a raw value against a field's domain
///
/// # Errors
///
/// Returns the field's `Invalid*` error when `raw` is not a member.
pub fn validate<T: Domain>(raw: u32) -> Result<T, T::Error> {
    T::try_from(raw)
}

/// Whether `raw` encodes a member of `T`
#[must_use]
pub fn is_member<T: Domain>(raw: u32) -> bool {
    T::ALL.iter().any(|m| m.encoding() == raw)
}

/// Declare a closed configuration enum and its validator
macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident: $err:ident::$invalid:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $raw:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[cfg_attr(feature = "embedded", derive(defmt::Format))]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Register encoding
            #[must_use]
            pub const fn raw(self) -> u32 {
                match self {
                    $( Self::$variant => $raw, )+
                }
            }
        }

        impl TryFrom<u32> for $name {
            type Error = $err;

            fn try_from(raw: u32) -> Result<Self, $err> {
                match raw {
                    $( $raw => Ok(Self::$variant), )+
                    _ => Err($err::$invalid),
                }
            }
        }

        impl $crate::validate::Domain for $name {
            const ALL: &'static [Self] = &[ $( Self::$variant, )+ ];

            fn encoding(self) -> u32 {
                self.raw()
            }
        }
    };
}
