//! Helper macros.
//!

/// Build a `PathBuf` out of several path components.
///
#[macro_export]
macro_rules! makepath {
    ($($item:expr),+) => {
        [
        $(std::path::PathBuf::from($item),)+
        ]
        .iter()
        .collect::<std::path::PathBuf>()
    };
}
