//! Macros for ergonomic machine construction.

/// Generate a state enum and its `State` implementation.
///
/// # Example
///
/// ```
/// use trialtree::state_enum;
///
/// state_enum! {
///     pub enum BlockState {
///         Idle,
///         Wave,
///         Questionnaire,
///         End,
///         Failed,
///     }
///     final: [End, Failed]
///     error: [Failed]
/// }
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => stringify!($variant)),*
                }
            }

            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }
    };
}

/// Generate an event enum and its `Event` implementation.
///
/// Variants may carry payloads; the event name is the variant name.
///
/// # Example
///
/// ```
/// use trialtree::core::Event;
/// use trialtree::event_enum;
///
/// event_enum! {
///     pub enum WaveEvent {
///         Touched(usize),
///         Timeout,
///     }
/// }
///
/// assert_eq!(WaveEvent::Touched(2).name(), "Touched");
/// ```
#[macro_export]
macro_rules! event_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(($($field:ty),* $(,)?))?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Debug)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(($($field),*))?
            ),*
        }

        impl $crate::core::Event for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => stringify!($variant)),*
                }
            }
        }
    };
}
