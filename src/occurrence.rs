// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{Occurrence, OccurrenceStatus};
use crate::schema::occurrences;
use chrono::{DateTime, Utc};
use diesel::dsl::max;
use diesel::prelude::*;
use std::error::Error;
use std::fmt;

/// Allocates the next occurrence number: one more than the current maximum, starting at 1.
///
/// This is a plain scan-and-increment; the unique constraint on the column catches the case
/// where two creations race, and the loser's transaction fails.
pub fn next_occurrence_number(db_connection: &mut PgConnection) -> QueryResult<i32> {
	let current_max: Option<i32> = occurrences::table
		.select(max(occurrences::occurrence_number))
		.first(db_connection)?;
	Ok(current_max.unwrap_or(0) + 1)
}

/// The reporter-entered fields of a new occurrence
pub struct NewOccurrence {
	pub reported_by: String,
	pub occurred_at: DateTime<Utc>,
	pub location: String,
	pub description: String,
	pub category: String,
}

/// Creates an occurrence, allocating its number inside the insert transaction.
pub fn create_occurrence(
	db_connection: &mut PgConnection,
	new_occurrence: NewOccurrence,
	now: DateTime<Utc>,
) -> QueryResult<Occurrence> {
	db_connection.transaction(|db_connection| {
		let occurrence_number = next_occurrence_number(db_connection)?;
		let occurrence = Occurrence {
			id: cuid2::create_id(),
			occurrence_number,
			reported_by: new_occurrence.reported_by,
			occurred_at: new_occurrence.occurred_at,
			location: new_occurrence.location,
			description: new_occurrence.description,
			category: new_occurrence.category,
			status: OccurrenceStatus::Open,
			created_at: now,
			closed_at: None,
		};
		diesel::insert_into(occurrences::table)
			.values(&occurrence)
			.execute(db_connection)?;
		Ok(occurrence)
	})
}

/// Whether an occurrence may move from one status to another.
///
/// Closing is reachable from either live status; a closed occurrence can only be reopened.
pub fn status_transition_allowed(from: OccurrenceStatus, to: OccurrenceStatus) -> bool {
	match (from, to) {
		(OccurrenceStatus::Open, OccurrenceStatus::InReview) => true,
		(OccurrenceStatus::Open, OccurrenceStatus::Closed) => true,
		(OccurrenceStatus::InReview, OccurrenceStatus::Closed) => true,
		(OccurrenceStatus::InReview, OccurrenceStatus::Open) => true,
		(OccurrenceStatus::Closed, OccurrenceStatus::Open) => true,
		_ => false,
	}
}

/// An error from changing an occurrence's status
#[derive(Debug)]
pub enum StatusChangeError {
	/// The occurrence doesn't exist
	NotFound,
	/// The requested transition isn't allowed from the occurrence's current status
	NotAllowed,
	/// The database failed underneath the operation
	Database(diesel::result::Error),
}

impl fmt::Display for StatusChangeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotFound => f.write_str("no such occurrence"),
			Self::NotAllowed => f.write_str("status change not allowed"),
			Self::Database(error) => write!(f, "database error: {}", error),
		}
	}
}

impl Error for StatusChangeError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Database(error) => Some(error),
			_ => None,
		}
	}
}

impl From<diesel::result::Error> for StatusChangeError {
	fn from(error: diesel::result::Error) -> Self {
		Self::Database(error)
	}
}

/// Moves an occurrence to a new status. Closing stamps `closed_at`; any move away from closed
/// clears it again.
pub fn change_status(
	db_connection: &mut PgConnection,
	occurrence_id: &str,
	new_status: OccurrenceStatus,
	now: DateTime<Utc>,
) -> Result<(), StatusChangeError> {
	db_connection.transaction(|db_connection| {
		let occurrence: Option<Occurrence> = occurrences::table
			.find(occurrence_id)
			.first(db_connection)
			.optional()?;
		let Some(occurrence) = occurrence else {
			return Err(StatusChangeError::NotFound);
		};
		if !status_transition_allowed(occurrence.status, new_status) {
			return Err(StatusChangeError::NotAllowed);
		}

		let closed_at = if new_status == OccurrenceStatus::Closed {
			Some(now)
		} else {
			None
		};
		diesel::update(occurrences::table.find(occurrence_id))
			.set((occurrences::status.eq(new_status), occurrences::closed_at.eq(closed_at)))
			.execute(db_connection)?;
		Ok(())
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn open_occurrences_move_forward() {
		assert!(status_transition_allowed(
			OccurrenceStatus::Open,
			OccurrenceStatus::InReview
		));
		assert!(status_transition_allowed(OccurrenceStatus::Open, OccurrenceStatus::Closed));
		assert!(status_transition_allowed(
			OccurrenceStatus::InReview,
			OccurrenceStatus::Closed
		));
	}

	#[test]
	fn review_can_step_back_to_open() {
		assert!(status_transition_allowed(
			OccurrenceStatus::InReview,
			OccurrenceStatus::Open
		));
	}

	#[test]
	fn closed_occurrences_only_reopen() {
		assert!(status_transition_allowed(OccurrenceStatus::Closed, OccurrenceStatus::Open));
		assert!(!status_transition_allowed(
			OccurrenceStatus::Closed,
			OccurrenceStatus::InReview
		));
		assert!(!status_transition_allowed(
			OccurrenceStatus::Closed,
			OccurrenceStatus::Closed
		));
	}

	#[test]
	fn no_status_transitions_to_itself() {
		for status in [OccurrenceStatus::Open, OccurrenceStatus::InReview, OccurrenceStatus::Closed] {
			assert!(!status_transition_allowed(status, status));
		}
	}
}
