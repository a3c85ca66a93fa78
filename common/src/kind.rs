//! Closed enums of the domain, stored as `INT2` and displayed in
//! `SCREAMING_SNAKE_CASE`.

/// Defines a closed `#[repr(u8)]` enum, parsed from and displayed as its
/// `SCREAMING_SNAKE_CASE` variant names.
///
/// Stored discriminants must never change once persisted.
///
/// # Example
///
/// ```rust
/// use common::define_kind;
///
/// define_kind! {
///     #[doc = "Stage of a review."]
///     enum Stage {
///         #[doc = "Awaiting a reviewer."]
///         Queued = 1,
///
///         #[doc = "Reviewed and closed."]
///         Done = 2,
///     }
/// }
///
/// assert_eq!(Stage::Queued.to_string(), "QUEUED");
/// assert_eq!("DONE".parse::<Stage>(), Ok(Stage::Done));
/// assert_eq!(Stage::Done.u8(), 2);
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            PartialEq,
        )]
        #[cfg_attr(
            feature = "serde",
            derive(
                $crate::private::serde::Deserialize,
                $crate::private::serde::Serialize,
            ),
            serde(rename_all = "SCREAMING_SNAKE_CASE"),
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant = $value,
            )*
        }

        impl $name {
            /// Returns the stored discriminant of this variant.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                match u8::try_from(i16::from_sql(ty, raw)?)? {
                    $(
                        v if Self::$variant.u8() == v => Ok(Self::$variant),
                    )*
                    v => Err(::std::format!(
                        "invalid `{}` value: {v}",
                        ::core::stringify!($name),
                    ).into()),
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

#[cfg(test)]
mod spec {
    define_kind! {
        #[doc = "Color of a light."]
        enum Light {
            #[doc = "Stop."]
            Red = 1,

            #[doc = "Go."]
            Green = 3,
        }
    }

    #[test]
    fn displays_and_parses_screaming_snake_case() {
        assert_eq!(Light::Red.to_string(), "RED");
        assert_eq!("GREEN".parse::<Light>(), Ok(Light::Green));
        assert!("Green".parse::<Light>().is_err());
    }

    #[test]
    fn keeps_explicit_discriminants() {
        assert_eq!(Light::Red.u8(), 1);
        assert_eq!(Light::Green.u8(), 3);
    }
}
