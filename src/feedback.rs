// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::{Assignment, Department, FeedbackToken, Occurrence, User};
use crate::schema::{assignments, departments, feedback_tokens, occurrences, users};
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use rand::distr::{Alphanumeric, SampleString};
use std::error::Error;
use std::fmt;

/// How long an issued feedback token remains valid
pub const TOKEN_VALIDITY_HOURS: i64 = 24;

/// Length of the generated token credential
const TOKEN_LENGTH: usize = 40;

/// Why a presented token was not accepted.
///
/// Checks happen in a fixed order: a token that is both expired and used reports [Self::Expired].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenRejection {
	/// No token record matches the presented value.
	Invalid,
	/// The current time exceeds the token's expiry timestamp.
	Expired,
	/// Feedback was already submitted against the token.
	AlreadyUsed,
}

impl fmt::Display for TokenRejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let reason = match self {
			Self::Invalid => "invalid",
			Self::Expired => "expired",
			Self::AlreadyUsed => "already-used",
		};
		f.write_str(reason)
	}
}

/// An error from a feedback token operation
#[derive(Debug)]
pub enum FeedbackError {
	/// The token failed validation
	Rejected(TokenRejection),
	/// The database failed underneath the operation
	Database(diesel::result::Error),
}

impl fmt::Display for FeedbackError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Rejected(rejection) => write!(f, "token rejected: {}", rejection),
			Self::Database(error) => write!(f, "database error: {}", error),
		}
	}
}

impl Error for FeedbackError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::Rejected(_) => None,
			Self::Database(error) => Some(error),
		}
	}
}

impl From<diesel::result::Error> for FeedbackError {
	fn from(error: diesel::result::Error) -> Self {
		Self::Database(error)
	}
}

/// Everything a successful validation resolves for the respondent-facing page
pub struct ValidatedToken {
	pub token: FeedbackToken,
	pub assignment: Assignment,
	pub occurrence: Occurrence,
	pub department: Department,
	pub issuer: User,
}

fn generate_token_value() -> String {
	Alphanumeric.sample_string(&mut rand::rng(), TOKEN_LENGTH)
}

/// Checks whether a token record is still live.
///
/// Expiry is checked before the used flag, matching the order validation reports rejections in.
fn check_token_state(token: &FeedbackToken, now: DateTime<Utc>) -> Result<(), TokenRejection> {
	if now > token.expires_at {
		return Err(TokenRejection::Expired);
	}
	if token.used {
		return Err(TokenRejection::AlreadyUsed);
	}
	Ok(())
}

/// Issues a new feedback token for an assignment.
///
/// Any other live (unexpired, unused) tokens for the same assignment are deleted first, so at
/// most one live token exists per assignment at a time.
pub fn issue_token(
	db_connection: &mut PgConnection,
	assignment_id: &str,
	issued_by: &str,
	now: DateTime<Utc>,
) -> QueryResult<FeedbackToken> {
	db_connection.transaction(|db_connection| {
		diesel::delete(feedback_tokens::table)
			.filter(
				feedback_tokens::assignment
					.eq(assignment_id)
					.and(feedback_tokens::used.eq(false))
					.and(feedback_tokens::expires_at.ge(now)),
			)
			.execute(db_connection)?;

		let new_token = FeedbackToken {
			token: generate_token_value(),
			assignment: String::from(assignment_id),
			issued_by: String::from(issued_by),
			created_at: now,
			expires_at: now + Duration::hours(TOKEN_VALIDITY_HOURS),
			used: false,
			response_message: None,
			responded_at: None,
		};
		diesel::insert_into(feedback_tokens::table)
			.values(&new_token)
			.execute(db_connection)?;

		Ok(new_token)
	})
}

/// Validates a presented token value and resolves the records the respondent page shows.
pub fn validate_token(
	db_connection: &mut PgConnection,
	token_value: &str,
	now: DateTime<Utc>,
) -> Result<ValidatedToken, FeedbackError> {
	let token: Option<FeedbackToken> = feedback_tokens::table
		.find(token_value)
		.first(db_connection)
		.optional()?;
	let Some(token) = token else {
		return Err(FeedbackError::Rejected(TokenRejection::Invalid));
	};
	check_token_state(&token, now).map_err(FeedbackError::Rejected)?;

	let assignment: Assignment = assignments::table.find(&token.assignment).first(db_connection)?;
	let occurrence: Occurrence = occurrences::table.find(&assignment.occurrence).first(db_connection)?;
	let department: Department = departments::table.find(&assignment.department).first(db_connection)?;
	let issuer: User = users::table.find(&token.issued_by).first(db_connection)?;

	Ok(ValidatedToken {
		token,
		assignment,
		occurrence,
		department,
		issuer,
	})
}

/// Submits feedback against a token.
///
/// The only write is a single conditional row update setting the used flag and recording the
/// response; a token that was used or expired in the meantime matches zero rows, and the
/// follow-up read classifies the rejection.
pub fn submit_feedback(
	db_connection: &mut PgConnection,
	token_value: &str,
	message: &str,
	now: DateTime<Utc>,
) -> Result<(), FeedbackError> {
	let updated_rows = diesel::update(feedback_tokens::table)
		.filter(
			feedback_tokens::token
				.eq(token_value)
				.and(feedback_tokens::used.eq(false))
				.and(feedback_tokens::expires_at.ge(now)),
		)
		.set((
			feedback_tokens::used.eq(true),
			feedback_tokens::response_message.eq(Some(message)),
			feedback_tokens::responded_at.eq(Some(now)),
		))
		.execute(db_connection)?;
	if updated_rows == 1 {
		return Ok(());
	}

	let token: Option<FeedbackToken> = feedback_tokens::table
		.find(token_value)
		.first(db_connection)
		.optional()?;
	let Some(token) = token else {
		return Err(FeedbackError::Rejected(TokenRejection::Invalid));
	};
	check_token_state(&token, now).map_err(FeedbackError::Rejected)?;

	// The record passed the state check but the conditional update didn't match it, so another
	// submission landed between the two statements.
	Err(FeedbackError::Rejected(TokenRejection::AlreadyUsed))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn token_record(created_at: DateTime<Utc>, used: bool) -> FeedbackToken {
		FeedbackToken {
			token: generate_token_value(),
			assignment: String::from("assignment"),
			issued_by: String::from("issuer"),
			created_at,
			expires_at: created_at + Duration::hours(TOKEN_VALIDITY_HOURS),
			used,
			response_message: None,
			responded_at: None,
		}
	}

	fn base_time() -> DateTime<Utc> {
		DateTime::parse_from_rfc3339("2025-07-15T09:30:00Z").unwrap().to_utc()
	}

	#[test]
	fn live_token_passes_state_check() {
		let created = base_time();
		let token = token_record(created, false);
		assert_eq!(check_token_state(&token, created + Duration::hours(23)), Ok(()));
	}

	#[test]
	fn token_expires_after_validity_window() {
		let created = base_time();
		let token = token_record(created, false);
		let just_past = created + Duration::hours(TOKEN_VALIDITY_HOURS) + Duration::seconds(1);
		assert_eq!(check_token_state(&token, just_past), Err(TokenRejection::Expired));
	}

	#[test]
	fn token_is_valid_at_exact_expiry_instant() {
		let created = base_time();
		let token = token_record(created, false);
		let exact_expiry = created + Duration::hours(TOKEN_VALIDITY_HOURS);
		assert_eq!(check_token_state(&token, exact_expiry), Ok(()));
	}

	#[test]
	fn used_token_is_rejected() {
		let created = base_time();
		let token = token_record(created, true);
		assert_eq!(
			check_token_state(&token, created + Duration::hours(1)),
			Err(TokenRejection::AlreadyUsed)
		);
	}

	#[test]
	fn expiry_is_reported_before_use() {
		let created = base_time();
		let token = token_record(created, true);
		let late = created + Duration::days(2);
		assert_eq!(check_token_state(&token, late), Err(TokenRejection::Expired));
	}

	#[test]
	fn generated_token_values_are_opaque_and_distinct() {
		let first = generate_token_value();
		let second = generate_token_value();
		assert_eq!(first.len(), TOKEN_LENGTH);
		assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
		assert_ne!(first, second);
	}

	#[test]
	fn rejection_reasons_render_like_the_api_reports_them() {
		assert_eq!(TokenRejection::Invalid.to_string(), "invalid");
		assert_eq!(TokenRejection::Expired.to_string(), "expired");
		assert_eq!(TokenRejection::AlreadyUsed.to_string(), "already-used");
	}
}
