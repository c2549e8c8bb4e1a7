//! Free-throw shooting metrics
//!
//! Pure arithmetic over made/attempted counts. All quotients are computed in
//! `f64` and rounded up with `f64::ceil`.

/// Fraction of attempts made (0.0 when nothing was attempted)
pub fn shooting_rate(made: u32, attempted: u32) -> f64 {
    if attempted == 0 {
        return 0.0;
    }
    made as f64 / attempted as f64
}

/// Shooting percentage on a 0-100 scale
pub fn percentage(made: u32, attempted: u32) -> f64 {
    shooting_rate(made, attempted) * 100.0
}

/// Consecutive makes needed for the running percentage to reach `goal_pct`.
///
/// Zero or negative means the goal is already met; the value is not clamped so
/// callers can tell how far past the goal the team is.
pub fn consecutive_makes_needed(made: u32, attempted: u32, goal_pct: f64) -> i64 {
    let shortfall = goal_pct * attempted as f64 - made as f64;
    (shortfall / (1.0 - goal_pct)).ceil() as i64
}

/// Free throws "left at the line" relative to shooting `goal_pct`.
///
/// Always <= 0. The magnitude is the number of extra makes the team would have
/// had at the goal rate, read as points since each free throw is worth one.
pub fn missed_opportunity_points(made: u32, attempted: u32, goal_pct: f64) -> i64 {
    let surplus = made as f64 - goal_pct * attempted as f64;
    ((surplus / goal_pct).ceil() as i64).min(0)
}
