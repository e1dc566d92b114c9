//! Cron schedule helpers.

use chrono::Utc;
use cron::Schedule;

/// Milliseconds between the next two firings of `cron_schedule`.
///
/// Returns `None` for an unparsable expression or a schedule that never fires twice.
pub fn get_cron_interval_ms(cron_schedule: &str) -> Option<i64> {
	let schedule = cron_schedule.parse::<Schedule>().ok()?;
	let mut upcoming = schedule.after(&Utc::now()).take(2);

	match (upcoming.next(), upcoming.next()) {
		(Some(first), Some(second)) => Some((second - first).num_milliseconds()),
		_ => None,
	}
}
