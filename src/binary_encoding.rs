use crate::errors::DecodeError;

/// A type with a canonical binary form, either fixed-length (`[u8; N]`)
/// or variable-length (`Vec<u8>`).
///
/// Hex and serde support for a type follow from its `BinaryEncoding`
/// implementation via the `impl_encoding_traits` macro.
pub trait BinaryEncoding: Sized {
    /// The serialized form: `[u8; N]` or `Vec<u8>`.
    type Serialized;

    /// Serialize to the canonical binary form.
    fn to_bytes(&self) -> Self::Serialized;

    /// Parse from the canonical binary form.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError<Self>>;
}

/// Derives hex formatting and parsing, byte conversions, inherent
/// `serialize`/`from_bytes`/`from_hex` aliases, and serde support from a
/// type's [`BinaryEncoding`] implementation.
///
/// Invoke as `impl_encoding_traits!(Type, N)` for a fixed `N`-byte encoding,
/// or `impl_encoding_traits!(Type)` for a variable-length encoding.
macro_rules! impl_encoding_traits {
    ($typename:ty, $byte_len:expr) => {
        const _: () = {
            fn __(x: $typename) -> impl BinaryEncoding<Serialized = [u8; $byte_len]> {
                x
            }
        };

        impl std::fmt::LowerHex for $typename {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut buffer = [0; $byte_len * 2];
                let encoded = base16ct::lower::encode_str(&self.to_bytes(), &mut buffer)
                    .map_err(|_| std::fmt::Error)?;
                f.write_str(encoded)
            }
        }

        impl std::fmt::UpperHex for $typename {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut buffer = [0; $byte_len * 2];
                let encoded = base16ct::upper::encode_str(&self.to_bytes(), &mut buffer)
                    .map_err(|_| std::fmt::Error)?;
                f.write_str(encoded)
            }
        }

        impl std::str::FromStr for $typename {
            type Err = DecodeError<Self>;

            /// Parses from upper or lower case hex.
            fn from_str(hex: &str) -> Result<Self, Self::Err> {
                let mut buffer = [0; $byte_len];
                let bytes = base16ct::mixed::decode(hex, &mut buffer)?;
                <Self as BinaryEncoding>::from_bytes(bytes)
            }
        }

        impl TryFrom<&[u8]> for $typename {
            type Error = DecodeError<Self>;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                <Self as BinaryEncoding>::from_bytes(bytes)
            }
        }

        impl TryFrom<[u8; $byte_len]> for $typename {
            type Error = DecodeError<Self>;

            fn try_from(bytes: [u8; $byte_len]) -> Result<Self, Self::Error> {
                <Self as BinaryEncoding>::from_bytes(&bytes)
            }
        }

        impl From<$typename> for [u8; $byte_len] {
            fn from(value: $typename) -> Self {
                value.to_bytes()
            }
        }

        impl From<$typename> for Vec<u8> {
            fn from(value: $typename) -> Self {
                Vec::from(value.to_bytes())
            }
        }

        impl $typename {
            /// Serializes to the fixed-length binary form. Same as
            /// [`BinaryEncoding::to_bytes`].
            pub fn serialize(&self) -> [u8; $byte_len] {
                <Self as BinaryEncoding>::to_bytes(self)
            }

            /// Parses the fixed-length binary form. Same as
            /// [`BinaryEncoding::from_bytes`].
            pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError<Self>> {
                <Self as BinaryEncoding>::from_bytes(bytes)
            }

            /// Parses from upper or lower case hex.
            pub fn from_hex(hex: &str) -> Result<Self, DecodeError<Self>> {
                hex.parse()
            }
        }

        #[cfg(any(test, feature = "serde"))]
        impl serde::Serialize for $typename {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serdect::array::serialize_hex_lower_or_bin(&self.to_bytes(), serializer)
            }
        }

        #[cfg(any(test, feature = "serde"))]
        impl<'de> serde::Deserialize<'de> for $typename {
            /// Accepts a hex string from human-readable formats and raw
            /// bytes from binary formats.
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let mut buffer = [0u8; $byte_len];
                let bytes = serdect::slice::deserialize_hex_or_bin(&mut buffer, deserializer)?;
                <$typename>::from_bytes(bytes).map_err(|_| {
                    serde::de::Error::invalid_value(
                        serde::de::Unexpected::Bytes(bytes),
                        &concat!("a byte array representing ", stringify!($typename)),
                    )
                })
            }
        }
    };

    ($typename:ty) => {
        const _: () = {
            fn __(x: $typename) -> impl BinaryEncoding<Serialized = Vec<u8>> {
                x
            }
        };

        impl std::fmt::LowerHex for $typename {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(&base16ct::lower::encode_string(&self.to_bytes()))
            }
        }

        impl std::fmt::UpperHex for $typename {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str(&base16ct::upper::encode_string(&self.to_bytes()))
            }
        }

        impl std::str::FromStr for $typename {
            type Err = DecodeError<Self>;

            /// Parses from upper or lower case hex.
            fn from_str(hex: &str) -> Result<Self, Self::Err> {
                let bytes = base16ct::mixed::decode_vec(hex)?;
                <Self as BinaryEncoding>::from_bytes(&bytes)
            }
        }

        impl TryFrom<&[u8]> for $typename {
            type Error = DecodeError<Self>;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                <Self as BinaryEncoding>::from_bytes(bytes)
            }
        }

        impl From<$typename> for Vec<u8> {
            fn from(value: $typename) -> Self {
                value.to_bytes()
            }
        }

        impl $typename {
            /// Serializes to the variable-length binary form. Same as
            /// [`BinaryEncoding::to_bytes`].
            pub fn serialize(&self) -> Vec<u8> {
                <Self as BinaryEncoding>::to_bytes(self)
            }

            /// Parses the variable-length binary form. Same as
            /// [`BinaryEncoding::from_bytes`].
            pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError<Self>> {
                <Self as BinaryEncoding>::from_bytes(bytes)
            }

            /// Parses from upper or lower case hex.
            pub fn from_hex(hex: &str) -> Result<Self, DecodeError<Self>> {
                hex.parse()
            }
        }

        #[cfg(any(test, feature = "serde"))]
        impl serde::Serialize for $typename {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serdect::slice::serialize_hex_lower_or_bin(&self.to_bytes(), serializer)
            }
        }

        #[cfg(any(test, feature = "serde"))]
        impl<'de> serde::Deserialize<'de> for $typename {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let bytes = serdect::slice::deserialize_hex_or_bin_vec(deserializer)?;
                <$typename>::from_bytes(&bytes).map_err(|_| {
                    serde::de::Error::invalid_value(
                        serde::de::Unexpected::Bytes(&bytes),
                        &concat!("a byte vector representing ", stringify!($typename)),
                    )
                })
            }
        }
    };
}

/// Implements `Display` as lower-case hex.
macro_rules! impl_hex_display {
    ($typename:ident) => {
        impl std::fmt::Display for $typename {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{:x}", self)
            }
        }
    };
}
