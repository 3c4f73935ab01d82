//! Post-training recovery impact
//!
//! A completed session lowers the user's recovery score in proportion to the
//! volume lifted. The adjustment itself is pure; persisting the adjusted
//! reading is done by [`crate::service::RecoveryService`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Score adjustment caused by a session of `total_volume`
///
/// | Volume        | Impact |
/// |---------------|--------|
/// | > 10000       | −15    |
/// | > 5000        | −10    |
/// | > 2000        | −5     |
/// | otherwise     | −2     |
/// | missing       | 0      |
pub fn training_impact(total_volume: Option<Decimal>) -> i32 {
    match total_volume {
        Some(v) if v > dec!(10000) => -15,
        Some(v) if v > dec!(5000) => -10,
        Some(v) if v > dec!(2000) => -5,
        Some(_) => -2,
        None => 0,
    }
}

/// Apply an impact to a score, clamping to 0-100
pub fn apply_impact(current_score: u8, impact: i32) -> u8 {
    (current_score as i32 + impact).clamp(0, 100) as u8
}

/// Note attached to the reading written after a session
pub fn impact_note(session_id: &str, exercise_type: &str, total_volume: Decimal, impact: i32) -> String {
    format!(
        "Post-training adjustment {} (session {}, {} volume {})",
        impact,
        session_id,
        exercise_type,
        total_volume.normalize()
    )
}
