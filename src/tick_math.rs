//! Tick helpers for the pool's price grid.

/// Minimum and maximum tick values for full range
pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = 887272;

/// Round a tick down to the nearest tick divisible by the spacing.
///
/// The current tick reported by slot0 is not necessarily initializable; only
/// multiples of the spacing are. Floor division keeps rounding consistent
/// for negative ticks. The result is clamped to the global tick bounds.
pub fn nearest_initializable_tick(tick: i32, tick_spacing: i32) -> i32 {
    let rounded = tick.div_euclid(tick_spacing) * tick_spacing;
    rounded.clamp(MIN_TICK, MAX_TICK)
}

/// Initializable ticks at `active + k * spacing` for `k` in
/// `[-surrounding, +surrounding]`, ascending, truncated at the global tick
/// bounds. The window is dense: every in-bounds step is present whether or
/// not the tick holds liquidity.
pub fn tick_window(active_tick: i32, tick_spacing: i32, surrounding: u32) -> Vec<i32> {
    let active = i64::from(active_tick);
    let spacing = i64::from(tick_spacing);
    let steps = i64::from(surrounding);

    (-steps..=steps)
        .map(|k| active + k * spacing)
        .filter(|tick| *tick >= i64::from(MIN_TICK) && *tick <= i64::from(MAX_TICK))
        .map(|tick| tick as i32)
        .collect()
}
