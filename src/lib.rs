pub mod coverage;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Log a message every 100 coverage ticks when the `perf_stats` feature is enabled.
///
/// Without the feature this expands to an empty block and the arguments are
/// never evaluated.
///
/// # Example
/// ```ignore
/// profile_log!(tick, "Tick {} routed {} pairs", tick.0, pairs);
/// ```
#[macro_export]
#[cfg(feature = "perf_stats")]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {
        if $tick.0 % 100 == 0 {
            bevy::prelude::info!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "perf_stats"))]
macro_rules! profile_log {
    ($tick:expr, $($arg:tt)*) => {};
}
