macro_rules! fatal {
    ($($arg:tt)+) => {{
        log::error!($($arg)+);
        std::process::exit(1);
    }}
}

macro_rules! arena_ids {
    ($name:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(pub(crate) crate::arena::RawId);

        impl crate::arena::ArenaId for $name {
            fn from_raw(raw: crate::arena::RawId) -> Self {
                Self(raw)
            }

            fn raw(self) -> crate::arena::RawId {
                self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}
