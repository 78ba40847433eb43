use crate::clock::Interval;
use crate::error::{Result, SchedulerError};

/// Rejects `candidate` once the overlapping load would reach `capacity`.
pub fn check_capacity(occupied: &[Interval], candidate: &Interval, capacity: u32) -> Result<()> {
    let mut concurrent = 0u32;
    for interval in occupied {
        if interval.overlaps(candidate) {
            concurrent += 1;
            if concurrent >= capacity {
                return Err(SchedulerError::CapacityExceeded { limit: capacity });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn iv(start: &str, end: &str) -> Interval {
        let parse = |s: &str| {
            NaiveDateTime::parse_from_str(&format!("2025-08-18T{}", s), "%Y-%m-%dT%H:%M").unwrap()
        };
        Interval::new(parse(start), parse(end))
    }

    #[test]
    fn back_to_back_fits_capacity_one() {
        let occupied = vec![iv("10:00", "10:30")];
        assert!(check_capacity(&occupied, &iv("10:30", "11:00"), 1).is_ok());
        assert!(check_capacity(&occupied, &iv("09:30", "10:00"), 1).is_ok());
        let err = check_capacity(&occupied, &iv("10:15", "10:45"), 1).unwrap_err();
        assert_eq!(err.to_string(), "maximum capacity (1) reached at that time");
    }

    #[test]
    fn counts_only_overlaps() {
        let occupied = vec![iv("10:00", "10:30"), iv("10:30", "12:00"), iv("11:00", "11:45")];
        assert!(check_capacity(&occupied, &iv("10:15", "11:15"), 4).is_ok());
        assert!(check_capacity(&occupied, &iv("10:15", "11:15"), 3).is_err());
        assert!(check_capacity(&occupied, &iv("12:00", "12:30"), 1).is_ok());
        assert!(check_capacity(&occupied, &iv("11:00", "11:30"), 3).is_ok());
        assert!(check_capacity(&occupied, &iv("11:00", "11:30"), 2).is_err());
    }
}
