// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::schema::{
	assignments, department_members, departments, feedback_tokens, incident_categories, notification_preferences,
	notifications, occurrences, users,
};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use std::fmt;

/// Site-wide role a user holds, independent of department membership.
#[derive(Clone, Copy, DbEnum, Debug, Eq, PartialEq)]
#[ExistingTypePath = "crate::schema::sql_types::SiteRole"]
pub enum SiteRole {
	Member,
	Coordinator,
	Admin,
}

/// Severity carried by an incident taxonomy category.
///
/// Ordering is from least to most severe so reports can sort by it.
#[derive(Clone, Copy, DbEnum, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[ExistingTypePath = "crate::schema::sql_types::SeverityLevel"]
pub enum SeverityLevel {
	Low,
	Moderate,
	High,
	Extreme,
}

impl fmt::Display for SeverityLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Low => "Low",
			Self::Moderate => "Moderate",
			Self::High => "High",
			Self::Extreme => "Extreme",
		};
		f.write_str(name)
	}
}

/// Lifecycle state of an occurrence.
#[derive(Clone, Copy, DbEnum, Debug, Eq, PartialEq)]
#[ExistingTypePath = "crate::schema::sql_types::OccurrenceStatus"]
pub enum OccurrenceStatus {
	Open,
	InReview,
	Closed,
}

impl fmt::Display for OccurrenceStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Open => "Open",
			Self::InReview => "In review",
			Self::Closed => "Closed",
		};
		f.write_str(name)
	}
}

/// Lifecycle state of a department's work item on an occurrence.
#[derive(Clone, Copy, DbEnum, Debug, Eq, PartialEq)]
#[ExistingTypePath = "crate::schema::sql_types::AssignmentStatus"]
pub enum AssignmentStatus {
	Pending,
	Acknowledged,
	Completed,
}

impl fmt::Display for AssignmentStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Pending => "Pending",
			Self::Acknowledged => "Acknowledged",
			Self::Completed => "Completed",
		};
		f.write_str(name)
	}
}

/// The workflow event a notification reports.
#[derive(Clone, Copy, DbEnum, Debug, Eq, PartialEq)]
#[ExistingTypePath = "crate::schema::sql_types::NotificationKind"]
pub enum NotificationKind {
	AssignmentCreated,
	ReferralReceived,
	FeedbackReceived,
}

/// A user provisioned from the organization's single sign-on.
#[derive(Insertable, Queryable)]
pub struct User {
	/// The user's ID
	pub id: String,
	/// The subject claim reported by the SSO provider; stable across logins
	pub sso_subject: String,
	/// The name shown throughout the application
	pub display_name: String,
	pub email: String,
	pub site_role: SiteRole,
	/// Deactivated users keep their history but can no longer sign in.
	pub active: bool,
}

/// A department that can be made responsible for responding to occurrences
#[derive(Insertable, Queryable)]
pub struct Department {
	/// The department's ID
	pub id: String,
	/// The name of the department
	pub name: String,
	/// Inactive departments remain attached to their history but can't receive new assignments.
	pub active: bool,
}

/// Membership of a user in a department. Members see and work the department's assignment queue.
#[derive(Insertable, Queryable)]
#[diesel(table_name = department_members)]
pub struct DepartmentMember {
	pub department: String,
	pub user_id: String,
}

/// An incident taxonomy category. Categories form a hierarchy up to three levels deep
/// (main, sub, sub-sub); occurrences are filed against leaf categories.
#[derive(Insertable, Queryable)]
#[diesel(table_name = incident_categories)]
pub struct IncidentCategory {
	/// Category's ID
	pub id: String,
	/// The ID of the parent category; top-level categories have no parent.
	pub parent: Option<String>,
	/// The name of the category
	pub name: String,
	/// The severity an occurrence filed against this category carries
	pub severity: SeverityLevel,
	/// Inactive categories stay attached to existing occurrences but can't be selected for new ones.
	pub active: bool,
}

/// The database representation of an occurrence (a reported incident record)
#[derive(Insertable, Queryable)]
pub struct Occurrence {
	/// Occurrence's ID
	pub id: String,
	/// The human-facing sequential number for the occurrence.
	///
	/// Allocated by [crate::occurrence::next_occurrence_number] at creation time.
	pub occurrence_number: i32,
	/// The ID of the user who reported the occurrence
	pub reported_by: String,
	/// When the incident happened (as reported, not when it was entered)
	pub occurred_at: DateTime<Utc>,
	/// Where the incident happened, as free text
	pub location: String,
	/// The reporter's account of the incident
	pub description: String,
	/// The ID of the taxonomy category the occurrence is filed against
	pub category: String,
	pub status: OccurrenceStatus,
	pub created_at: DateTime<Utc>,
	/// Set when the occurrence is closed; cleared again if it's reopened.
	pub closed_at: Option<DateTime<Utc>>,
}

/// The database representation of an assignment, a department's work item on an occurrence
#[derive(Insertable, Queryable)]
pub struct Assignment {
	/// Assignment's ID
	pub id: String,
	/// The ID of the occurrence the assignment is for
	pub occurrence: String,
	/// The ID of the department responsible for responding
	pub department: String,
	/// The ID of the user who made the assignment
	pub assigned_by: String,
	pub status: AssignmentStatus,
	/// If the assignment was created by referral, the ID of the assignment it was referred from.
	pub referred_from: Option<String>,
	/// The department's response, recorded when the assignment is completed
	pub response: Option<String>,
	pub created_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
}

/// A single-use, time-limited credential allowing an unauthenticated party to submit one
/// feedback message tied to an assignment.
#[derive(Insertable, Queryable)]
pub struct FeedbackToken {
	/// The opaque random token value; doubles as the primary key.
	pub token: String,
	/// The ID of the assignment the token collects feedback for
	pub assignment: String,
	/// The ID of the user who issued the token
	pub issued_by: String,
	pub created_at: DateTime<Utc>,
	/// Validation fails once the current time passes this timestamp.
	pub expires_at: DateTime<Utc>,
	/// Set on submission; a used token can never be submitted against again.
	pub used: bool,
	/// The feedback message recorded on submission
	pub response_message: Option<String>,
	/// When the feedback was submitted
	pub responded_at: Option<DateTime<Utc>>,
}

/// An in-app notification shown on a user's dashboard
#[derive(Insertable, Queryable)]
pub struct Notification {
	/// Notification's ID
	pub id: String,
	/// The ID of the user the notification is for
	pub recipient: String,
	pub kind: NotificationKind,
	/// The ID of the occurrence the event relates to
	pub occurrence: String,
	/// The ID of the related assignment, where the event has one
	pub assignment: Option<String>,
	/// Pre-rendered notification text
	pub body: String,
	/// Set when the recipient marks the notification read.
	pub read_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
}

/// A user's notification switches. A user with no stored row gets every notification;
/// see [crate::notify::NotificationPreferences].
#[derive(Insertable, Queryable)]
#[diesel(table_name = notification_preferences)]
pub struct NotificationPreference {
	pub user_id: String,
	pub on_assignment_created: bool,
	pub on_referral_received: bool,
	pub on_feedback_received: bool,
}

/// A web session record
#[derive(Insertable, Queryable)]
#[diesel(table_name = crate::schema::sessions)]
pub struct Session {
	pub session_id: BigDecimal,
	pub data: String,
	pub expires: DateTime<Utc>,
}
