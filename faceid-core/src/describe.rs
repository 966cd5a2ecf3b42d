//! Declarative status tables
//!
//! Each table lists every enumerator once, with its numeric code and an
//! optional human-readable label. When no label is given the enumerator name is
//! used, so an entry can never carry another entry's text.
//!
//! The macro generates the enum itself, `ALL`, `label()`, `description()`,
//! `describe(raw)`, `TryFrom<i32>`, `From<_> for i32` and `Display`.
//! Tables declared with `serial Base` delegate the description of every value
//! at or above [`SERIAL_BASE`](crate::status::SERIAL_BASE) to `Base` whenever
//! `Base` declares the same code.

macro_rules! __describe_label {
    ($variant:ident) => {
        stringify!($variant)
    };
    ($variant:ident, $label:literal) => {
        $label
    };
}

macro_rules! described_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($unknown:literal) $(serial $base:ident)? {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal $(=> $label:literal)?
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(i32)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $name {
            /// Every declared value, in table order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Description of any undeclared code
            pub const UNKNOWN: &'static str = $unknown;

            /// Numeric code
            pub const fn code(self) -> i32 {
                self as i32
            }

            /// Label from this table, without delegation
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => __describe_label!($variant $(, $label)?),)+
                }
            }

            /// Human-readable description
            pub fn description(self) -> &'static str {
                $(
                    if self.code() >= $crate::status::SERIAL_BASE {
                        if let Ok(base) = $base::try_from(self.code()) {
                            return base.description();
                        }
                    }
                )?
                self.label()
            }

            /// Describe a raw code, falling back to [`Self::UNKNOWN`]
            pub fn describe(raw: i32) -> &'static str {
                Self::try_from(raw)
                    .map(Self::description)
                    .unwrap_or(Self::UNKNOWN)
            }
        }

        impl TryFrom<i32> for $name {
            type Error = $crate::error::Error;

            fn try_from(value: i32) -> $crate::error::Result<Self> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err($crate::error::Error::UnknownValue {
                        kind: stringify!($name),
                        value,
                    }),
                }
            }
        }

        impl From<$name> for i32 {
            fn from(value: $name) -> i32 {
                value as i32
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.description())
            }
        }
    };
}
