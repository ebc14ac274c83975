/// Builds an [`Error::Other`](crate::Error::Other) from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)+) => {
        $crate::Error::Other(anyhow::anyhow!($($arg)+))
    };
}
