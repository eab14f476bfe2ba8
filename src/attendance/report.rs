/// Attendance percentage aggregation
///
/// The denominator is the course's `total_sessions` counter, incremented at
/// QR issuance time, never a count of attendance records or QR images.

/// Attendance ratio as a percentage; 0 when no sessions have been held
pub fn percentage(total_sessions: i64, attended_sessions: i64) -> f64 {
    if total_sessions > 0 {
        attended_sessions as f64 / total_sessions as f64 * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_of_four_is_seventy_five() {
        assert_eq!(percentage(4, 3), 75.0);
    }

    #[test]
    fn test_no_sessions_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(0, 5), 0.0);
    }

    #[test]
    fn test_full_attendance() {
        assert_eq!(percentage(10, 10), 100.0);
    }

    #[test]
    fn test_zero_attendance() {
        assert_eq!(percentage(10, 0), 0.0);
    }
}
