// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{Notification, NotificationKind, NotificationPreference};
use crate::schema::{department_members, notification_preferences, notifications};
use chrono::{DateTime, Utc};
use diesel::prelude::*;

/// A user's effective notification switches.
///
/// A user with no stored preference row gets every notification, so the default is all-on.
#[derive(Clone, Copy, Debug)]
pub struct NotificationPreferences {
	pub on_assignment_created: bool,
	pub on_referral_received: bool,
	pub on_feedback_received: bool,
}

impl Default for NotificationPreferences {
	fn default() -> Self {
		Self {
			on_assignment_created: true,
			on_referral_received: true,
			on_feedback_received: true,
		}
	}
}

impl From<NotificationPreference> for NotificationPreferences {
	fn from(stored: NotificationPreference) -> Self {
		Self {
			on_assignment_created: stored.on_assignment_created,
			on_referral_received: stored.on_referral_received,
			on_feedback_received: stored.on_feedback_received,
		}
	}
}

impl NotificationPreferences {
	/// Whether this user receives notifications of the given kind
	pub fn allows(&self, kind: NotificationKind) -> bool {
		match kind {
			NotificationKind::AssignmentCreated => self.on_assignment_created,
			NotificationKind::ReferralReceived => self.on_referral_received,
			NotificationKind::FeedbackReceived => self.on_feedback_received,
		}
	}
}

/// Gets a user's effective notification preferences.
pub fn preferences_for_user(
	db_connection: &mut PgConnection,
	user_id: &str,
) -> QueryResult<NotificationPreferences> {
	let stored: Option<NotificationPreference> = notification_preferences::table
		.find(user_id)
		.first(db_connection)
		.optional()?;
	Ok(stored.map(Into::into).unwrap_or_default())
}

/// Records a notification for every member of a department whose preferences allow the event.
///
/// The acting user is skipped so nobody is notified about their own action. Returns how many
/// notifications were recorded.
pub fn notify_department(
	db_connection: &mut PgConnection,
	department_id: &str,
	exclude_user: &str,
	kind: NotificationKind,
	occurrence_id: &str,
	assignment_id: Option<&str>,
	body: &str,
	now: DateTime<Utc>,
) -> QueryResult<usize> {
	let member_ids: Vec<String> = department_members::table
		.filter(
			department_members::department
				.eq(department_id)
				.and(department_members::user_id.ne(exclude_user)),
		)
		.select(department_members::user_id)
		.load(db_connection)?;

	let stored_preferences: Vec<NotificationPreference> = notification_preferences::table
		.filter(notification_preferences::user_id.eq_any(&member_ids))
		.load(db_connection)?;

	let mut new_notifications: Vec<Notification> = Vec::with_capacity(member_ids.len());
	for member_id in member_ids {
		let preferences = stored_preferences
			.iter()
			.find(|stored| stored.user_id == member_id)
			.map(|stored| NotificationPreferences {
				on_assignment_created: stored.on_assignment_created,
				on_referral_received: stored.on_referral_received,
				on_feedback_received: stored.on_feedback_received,
			})
			.unwrap_or_default();
		if !preferences.allows(kind) {
			continue;
		}
		new_notifications.push(Notification {
			id: cuid2::create_id(),
			recipient: member_id,
			kind,
			occurrence: String::from(occurrence_id),
			assignment: assignment_id.map(String::from),
			body: String::from(body),
			read_at: None,
			created_at: now,
		});
	}

	let recorded = new_notifications.len();
	if !new_notifications.is_empty() {
		diesel::insert_into(notifications::table)
			.values(new_notifications)
			.execute(db_connection)?;
	}
	tracing::debug!(department = department_id, count = recorded, "Recorded department notifications");
	Ok(recorded)
}

/// Records a notification for a single user, honoring their preferences.
///
/// Returns whether a notification was recorded.
pub fn notify_user(
	db_connection: &mut PgConnection,
	recipient: &str,
	kind: NotificationKind,
	occurrence_id: &str,
	assignment_id: Option<&str>,
	body: &str,
	now: DateTime<Utc>,
) -> QueryResult<bool> {
	let preferences = preferences_for_user(db_connection, recipient)?;
	if !preferences.allows(kind) {
		return Ok(false);
	}

	let notification = Notification {
		id: cuid2::create_id(),
		recipient: String::from(recipient),
		kind,
		occurrence: String::from(occurrence_id),
		assignment: assignment_id.map(String::from),
		body: String::from(body),
		read_at: None,
		created_at: now,
	};
	diesel::insert_into(notifications::table)
		.values(notification)
		.execute(db_connection)?;
	Ok(true)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn preferences_default_to_all_on() {
		let preferences = NotificationPreferences::default();
		assert!(preferences.allows(NotificationKind::AssignmentCreated));
		assert!(preferences.allows(NotificationKind::ReferralReceived));
		assert!(preferences.allows(NotificationKind::FeedbackReceived));
	}

	#[test]
	fn each_switch_gates_only_its_kind() {
		let preferences = NotificationPreferences {
			on_assignment_created: false,
			on_referral_received: true,
			on_feedback_received: false,
		};
		assert!(!preferences.allows(NotificationKind::AssignmentCreated));
		assert!(preferences.allows(NotificationKind::ReferralReceived));
		assert!(!preferences.allows(NotificationKind::FeedbackReceived));
	}

	#[test]
	fn stored_row_overrides_the_default() {
		let stored = NotificationPreference {
			user_id: String::from("user"),
			on_assignment_created: true,
			on_referral_received: false,
			on_feedback_received: true,
		};
		let preferences: NotificationPreferences = stored.into();
		assert!(!preferences.allows(NotificationKind::ReferralReceived));
		assert!(preferences.allows(NotificationKind::FeedbackReceived));
	}
}
