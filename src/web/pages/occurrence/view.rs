// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::pages::errors::not_found::NotFound;
use crate::web::pages::utils::{OccurrenceParams, format_occurrence_number};
use chrono::{DateTime, Utc};
use leptos::prelude::*;
use leptos::task::spawn;
use leptos_router::hooks::use_params;
use serde::{Deserialize, Serialize};

#[component]
pub fn OccurrenceView() -> impl IntoView {
	let params = use_params::<OccurrenceParams>();
	let params = params.read();
	let params = params.as_ref().ok().cloned();

	let Some(params) = params else {
		return view! { <NotFound /> }.into_any();
	};
	let Some(occurrence_id) = params.occurrence.clone() else {
		return view! { <NotFound /> }.into_any();
	};

	let occurrence = Resource::new(|| (), {
		let occurrence_id = occurrence_id.clone();
		move |_| get_occurrence_data(occurrence_id.clone())
	});
	let departments = OnceResource::new(get_active_departments());

	let (selected_department, set_selected_department) = signal(String::new());
	let (selected_status, set_selected_status) = signal(String::new());
	let (action_error, set_action_error): (ReadSignal<Option<String>>, WriteSignal<Option<String>>) = signal(None);
	let (feedback_link, set_feedback_link): (
		ReadSignal<Option<(String, String)>>,
		WriteSignal<Option<(String, String)>>,
	) = signal(None);

	let assign_click = {
		let occurrence_id = occurrence_id.clone();
		move |_: leptos::ev::MouseEvent| {
			let occurrence_id = occurrence_id.clone();
			let department_id = selected_department.get();
			if department_id.is_empty() {
				return;
			}
			spawn(async move {
				match assign_department_to_occurrence(occurrence_id, department_id).await {
					Ok(()) => {
						set_action_error.set(None);
						occurrence.refetch();
					}
					Err(error) => set_action_error.set(Some(error.to_string())),
				}
			});
		}
	};

	let status_click = {
		let occurrence_id = occurrence_id.clone();
		move |_: leptos::ev::MouseEvent| {
			let occurrence_id = occurrence_id.clone();
			let new_status = selected_status.get();
			if new_status.is_empty() {
				return;
			}
			spawn(async move {
				match update_occurrence_status(occurrence_id, new_status).await {
					Ok(()) => {
						set_action_error.set(None);
						occurrence.refetch();
					}
					Err(error) => set_action_error.set(Some(error.to_string())),
				}
			});
		}
	};

	view! {
		<Transition fallback=|| view! { <div id="occurrence_view_loading">"Loading occurrence..."</div> }>
			{
				move || match occurrence
					.read()
					.as_ref()
					.and_then(|occurrence| occurrence.as_ref().ok())
					.and_then(|occurrence| occurrence.as_ref())
				{
					Some(occurrence_data) => {
						let occurrence_data = occurrence_data.clone();
						view! {
							<div id="occurrence_header">
								<h1 id="occurrence_number">{format_occurrence_number(occurrence_data.occurrence_number)}</h1>
								<div id="occurrence_status">{occurrence_data.status.clone()}</div>
								<div id="occurrence_severity">{occurrence_data.severity.clone()}</div>
							</div>
							{
								move || action_error.get().map(|error| view! {
									<div class="occurrence_action_error">{error}</div>
								})
							}
							<dl id="occurrence_details">
								<dt>"Category"</dt>
								<dd>{occurrence_data.category_path.clone()}</dd>
								<dt>"Occurred"</dt>
								<dd>{occurrence_data.occurred_at.to_rfc3339()}</dd>
								<dt>"Location"</dt>
								<dd>{occurrence_data.location.clone()}</dd>
								<dt>"Reported by"</dt>
								<dd>{occurrence_data.reported_by_name.clone()}</dd>
								<dt>"Reported"</dt>
								<dd>{occurrence_data.created_at.to_rfc3339()}</dd>
								{
									occurrence_data.closed_at.map(|closed_at| view! {
										<dt>"Closed"</dt>
										<dd>{closed_at.to_rfc3339()}</dd>
									})
								}
							</dl>
							<div id="occurrence_description">{occurrence_data.description.clone()}</div>
							{
								occurrence_data.can_manage.then(|| {
									let allowed_statuses = occurrence_data.allowed_statuses.clone();
									view! {
										<div id="occurrence_manage">
											<div class="occurrence_manage_status">
												<select on:change:target=move |event| set_selected_status.set(event.target().value())>
													<option value="">"Change status"</option>
													{
														allowed_statuses.iter().map(|status| view! {
															<option value={status.value.clone()}>{status.label.clone()}</option>
														}.into_any()).collect::<Vec<_>>()
													}
												</select>
												<button type="button" on:click=status_click.clone()>"Update status"</button>
											</div>
											<div class="occurrence_manage_assign">
												<Transition>
													<select on:change:target=move |event| set_selected_department.set(event.target().value())>
														<option value="">"Assign a department"</option>
														{
															move || match &departments.read().as_ref().and_then(|departments| departments.as_ref().ok()) {
																Some(department_options) => {
																	department_options.iter().map(|department| view! {
																		<option value={department.id.clone()}>{department.name.clone()}</option>
																	}.into_any()).collect::<Vec<_>>()
																}
																None => Vec::new()
															}
														}
													</select>
												</Transition>
												<button type="button" on:click=assign_click.clone()>"Assign"</button>
											</div>
										</div>
									}
								})
							}
							<div id="occurrence_assignments">
								<h2>"Assignments"</h2>
								{
									if occurrence_data.assignments.is_empty() {
										view! {
											<div class="occurrence_assignment_list_empty">"No departments assigned"</div>
										}.into_any()
									} else {
										occurrence_data.assignments.iter().map(|assignment| {
											let assignment_id = assignment.id.clone();
											let link_click = move |_: leptos::ev::MouseEvent| {
												let assignment_id = assignment_id.clone();
												spawn(async move {
													match issue_feedback_link(assignment_id.clone()).await {
														Ok(url) => {
															set_action_error.set(None);
															set_feedback_link.set(Some((assignment_id, url)));
														}
														Err(error) => set_action_error.set(Some(error.to_string())),
													}
												});
											};
											let this_assignment = assignment.id.clone();
											view! {
												<div class="occurrence_assignment">
													<div class="occurrence_assignment_start">
														<span class="occurrence_assignment_department">
															{assignment.department_name.clone()}
														</span>
														<span class="occurrence_assignment_status">
															{assignment.status.clone()}
														</span>
														<span class="occurrence_assignment_time">
															{assignment.created_at.to_rfc3339()}
														</span>
													</div>
													{
														assignment.referred_from_department.as_ref().map(|referrer| view! {
															<div class="occurrence_assignment_referral">
																"Referred from " {referrer.clone()}
															</div>
														})
													}
													{
														assignment.response.as_ref().map(|response| view! {
															<div class="occurrence_assignment_response">{response.clone()}</div>
														})
													}
													{
														(!assignment.feedback.is_empty()).then(|| view! {
															<div class="occurrence_assignment_feedback">
																<h3>"Feedback"</h3>
																{
																	assignment.feedback.iter().map(|feedback| view! {
																		<div class="occurrence_feedback_message">
																			<span class="occurrence_feedback_time">
																				{feedback.responded_at.to_rfc3339()}
																			</span>
																			<div class="occurrence_feedback_body">
																				{feedback.message.clone()}
																			</div>
																		</div>
																	}.into_any()).collect::<Vec<_>>()
																}
															</div>
														})
													}
													{
														assignment.can_work.then(|| view! {
															<button type="button" on:click=link_click.clone()>
																"New feedback link"
															</button>
														})
													}
													{
														move || feedback_link.get().filter(|(assignment_id, _)| *assignment_id == this_assignment).map(|(_, url)| view! {
															<div class="occurrence_feedback_link">
																"Share this link with the external party (valid for 24 hours):"
																<input type="text" readonly=true value={url} />
															</div>
														})
													}
												</div>
											}.into_any()
										}).collect::<Vec<_>>().into_any()
									}
								}
							</div>
						}.into_any()
					}
					None => {
						view! { <NotFound /> }.into_any()
					}
				}
			}
		</Transition>
	}
	.into_any()
}

/// A status the occurrence may move to from its current one
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StatusOption {
	pub value: String,
	pub label: String,
}

/// A feedback message collected for an assignment
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeedbackMessageData {
	pub message: String,
	pub responded_at: DateTime<Utc>,
}

/// An assignment as shown on the occurrence view
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AssignmentData {
	pub id: String,
	pub department_name: String,
	pub status: String,
	pub response: Option<String>,
	pub created_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	pub referred_from_department: Option<String>,
	/// Whether the current user works this assignment's department queue
	pub can_work: bool,
	pub feedback: Vec<FeedbackMessageData>,
}

/// Everything the occurrence view shows
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OccurrenceData {
	pub id: String,
	pub occurrence_number: i32,
	pub occurred_at: DateTime<Utc>,
	pub created_at: DateTime<Utc>,
	pub closed_at: Option<DateTime<Utc>>,
	pub location: String,
	pub description: String,
	pub category_path: String,
	pub severity: String,
	pub status: String,
	pub reported_by_name: String,
	/// Whether the current user can change status and assign departments
	pub can_manage: bool,
	pub allowed_statuses: Vec<StatusOption>,
	pub assignments: Vec<AssignmentData>,
}

/// A department that can be assigned to an occurrence
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DepartmentOption {
	pub id: String,
	pub name: String,
}

/// Gets the data shown on an occurrence's view.
///
/// Visibility: the reporter, admins, and members of an assigned department. Everyone else gets
/// the same not-found response as a nonexistent occurrence.
#[server]
async fn get_occurrence_data(occurrence_id: String) -> Result<Option<OccurrenceData>, ServerFnError> {
	use crate::model::{
		Assignment, Department, FeedbackToken, IncidentCategory, Occurrence, OccurrenceStatus, SiteRole, User,
	};
	use crate::occurrence::status_transition_allowed;
	use crate::schema::{
		assignments, department_members, departments, feedback_tokens, incident_categories, occurrences, users,
	};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;
	use std::collections::HashSet;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let occurrence: Option<Occurrence> = occurrences::table
		.find(&occurrence_id)
		.first(&mut db_connection)
		.optional()?;
	let Some(occurrence) = occurrence else {
		return Ok(None);
	};

	let occurrence_assignments: Vec<(Assignment, Department)> = assignments::table
		.inner_join(departments::table)
		.filter(assignments::occurrence.eq(&occurrence.id))
		.order(assignments::created_at.asc())
		.load(&mut db_connection)?;

	let member_departments: Vec<String> = department_members::table
		.filter(department_members::user_id.eq(&user.id))
		.select(department_members::department)
		.load(&mut db_connection)?;
	let member_departments: HashSet<String> = member_departments.into_iter().collect();

	let is_admin = user.site_role == SiteRole::Admin;
	let works_assigned_department = occurrence_assignments
		.iter()
		.any(|(assignment, _)| member_departments.contains(&assignment.department));

	if occurrence.reported_by != user.id && !is_admin && !works_assigned_department {
		return Ok(None);
	}
	let can_manage = is_admin || works_assigned_department;

	// Walk the taxonomy up from the filed leaf to build the full path.
	let category: IncidentCategory = incident_categories::table
		.find(&occurrence.category)
		.first(&mut db_connection)?;
	let severity = category.severity.to_string();
	let mut path_parts = vec![category.name];
	let mut parent_id = category.parent;
	while let Some(current_id) = parent_id {
		let parent: IncidentCategory = incident_categories::table
			.find(&current_id)
			.first(&mut db_connection)?;
		path_parts.push(parent.name);
		parent_id = parent.parent;
	}
	path_parts.reverse();

	let reporter: User = users::table.find(&occurrence.reported_by).first(&mut db_connection)?;

	let all_statuses = [
		(OccurrenceStatus::Open, "open", "Open"),
		(OccurrenceStatus::InReview, "in_review", "In review"),
		(OccurrenceStatus::Closed, "closed", "Closed"),
	];
	let allowed_statuses = all_statuses
		.iter()
		.filter(|(status, _, _)| status_transition_allowed(occurrence.status, *status))
		.map(|(_, value, label)| StatusOption {
			value: String::from(*value),
			label: String::from(*label),
		})
		.collect();

	let mut assignment_list: Vec<AssignmentData> = Vec::with_capacity(occurrence_assignments.len());
	for (assignment, department) in occurrence_assignments.iter() {
		let referred_from_department = match &assignment.referred_from {
			Some(source_id) => {
				let source: Option<(Assignment, Department)> = assignments::table
					.inner_join(departments::table)
					.filter(assignments::id.eq(source_id))
					.first(&mut db_connection)
					.optional()?;
				source.map(|(_, source_department)| source_department.name)
			}
			None => None,
		};

		let responses: Vec<FeedbackToken> = feedback_tokens::table
			.filter(
				feedback_tokens::assignment
					.eq(&assignment.id)
					.and(feedback_tokens::used.eq(true)),
			)
			.order(feedback_tokens::responded_at.asc())
			.load(&mut db_connection)?;
		let feedback = responses
			.into_iter()
			.filter_map(|token| match (token.response_message, token.responded_at) {
				(Some(message), Some(responded_at)) => Some(FeedbackMessageData { message, responded_at }),
				_ => None,
			})
			.collect();

		assignment_list.push(AssignmentData {
			id: assignment.id.clone(),
			department_name: department.name.clone(),
			status: assignment.status.to_string(),
			response: assignment.response.clone(),
			created_at: assignment.created_at,
			completed_at: assignment.completed_at,
			referred_from_department,
			can_work: is_admin || member_departments.contains(&assignment.department),
			feedback,
		});
	}

	Ok(Some(OccurrenceData {
		id: occurrence.id,
		occurrence_number: occurrence.occurrence_number,
		occurred_at: occurrence.occurred_at,
		created_at: occurrence.created_at,
		closed_at: occurrence.closed_at,
		location: occurrence.location,
		description: occurrence.description,
		category_path: path_parts.join(" / "),
		severity,
		status: occurrence.status.to_string(),
		reported_by_name: reporter.display_name,
		can_manage,
		allowed_statuses,
		assignments: assignment_list,
	}))
}

/// Gets the departments an occurrence can be assigned to.
#[server]
async fn get_active_departments() -> Result<Vec<DepartmentOption>, ServerFnError> {
	use crate::model::Department;
	use crate::schema::departments;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let active: Vec<Department> = departments::table
		.filter(departments::active.eq(true))
		.order(departments::name.asc())
		.load(&mut db_connection)?;

	Ok(active
		.into_iter()
		.map(|department| DepartmentOption {
			id: department.id,
			name: department.name,
		})
		.collect())
}

/// Assigns a department to an occurrence and notifies the department's members.
#[server]
async fn assign_department_to_occurrence(occurrence_id: String, department_id: String) -> Result<(), ServerFnError> {
	use crate::model::{Assignment, AssignmentStatus, Department, NotificationKind, Occurrence};
	use crate::notify::notify_department;
	use crate::schema::{assignments, departments, occurrences};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::pages::utils::format_occurrence_number;
	use crate::web::permissions::{PermissionLevel, permission_level_for_user};
	use crate::web::state::AppState;
	use chrono::Utc;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let permission_level = permission_level_for_user(&mut db_connection, &user)?;
	if permission_level == PermissionLevel::Member {
		return Err(ServerFnError::ServerError(String::from("Permission denied")));
	}

	let occurrence: Option<Occurrence> = occurrences::table
		.find(&occurrence_id)
		.first(&mut db_connection)
		.optional()?;
	let Some(occurrence) = occurrence else {
		return Err(ServerFnError::ServerError(String::from("No such occurrence")));
	};

	let department: Option<Department> = departments::table
		.find(&department_id)
		.first(&mut db_connection)
		.optional()?;
	let Some(department) = department else {
		return Err(ServerFnError::ServerError(String::from("No such department")));
	};
	if !department.active {
		return Err(ServerFnError::ServerError(String::from(
			"That department can't receive new assignments",
		)));
	}

	let live_assignments: i64 = assignments::table
		.filter(
			assignments::occurrence
				.eq(&occurrence.id)
				.and(assignments::department.eq(&department.id))
				.and(assignments::status.ne(AssignmentStatus::Completed)),
		)
		.count()
		.get_result(&mut db_connection)?;
	if live_assignments > 0 {
		return Err(ServerFnError::ServerError(String::from(
			"That department is already assigned",
		)));
	}

	let now = Utc::now();
	let new_assignment = Assignment {
		id: cuid2::create_id(),
		occurrence: occurrence.id.clone(),
		department: department.id.clone(),
		assigned_by: user.id.clone(),
		status: AssignmentStatus::Pending,
		referred_from: None,
		response: None,
		created_at: now,
		completed_at: None,
	};
	diesel::insert_into(assignments::table)
		.values(&new_assignment)
		.execute(&mut db_connection)?;

	let body = format!(
		"Occurrence {} was assigned to {}",
		format_occurrence_number(occurrence.occurrence_number),
		department.name
	);
	notify_department(
		&mut db_connection,
		&department.id,
		&user.id,
		NotificationKind::AssignmentCreated,
		&occurrence.id,
		Some(&new_assignment.id),
		&body,
		now,
	)?;

	Ok(())
}

/// Moves an occurrence to a new status.
#[server]
async fn update_occurrence_status(occurrence_id: String, new_status: String) -> Result<(), ServerFnError> {
	use crate::model::{OccurrenceStatus, SiteRole};
	use crate::occurrence::{StatusChangeError, change_status};
	use crate::schema::{assignments, department_members};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use chrono::Utc;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let new_status = match new_status.as_str() {
		"open" => OccurrenceStatus::Open,
		"in_review" => OccurrenceStatus::InReview,
		"closed" => OccurrenceStatus::Closed,
		_ => return Err(ServerFnError::ServerError(String::from("Unknown status"))),
	};

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	if user.site_role != SiteRole::Admin {
		let assigned_memberships: i64 = assignments::table
			.inner_join(
				department_members::table.on(department_members::department.eq(assignments::department)),
			)
			.filter(
				assignments::occurrence
					.eq(&occurrence_id)
					.and(department_members::user_id.eq(&user.id)),
			)
			.count()
			.get_result(&mut db_connection)?;
		if assigned_memberships == 0 {
			return Err(ServerFnError::ServerError(String::from("Permission denied")));
		}
	}

	match change_status(&mut db_connection, &occurrence_id, new_status, Utc::now()) {
		Ok(()) => Ok(()),
		Err(StatusChangeError::NotFound) => Err(ServerFnError::ServerError(String::from("No such occurrence"))),
		Err(StatusChangeError::NotAllowed) => Err(ServerFnError::ServerError(String::from(
			"That status change isn't allowed",
		))),
		Err(StatusChangeError::Database(error)) => Err(ServerFnError::ServerError(error.to_string())),
	}
}

/// Issues a fresh feedback link for an assignment and returns the URL to share.
///
/// Any previous live link for the assignment stops working; see [crate::feedback::issue_token].
#[server]
async fn issue_feedback_link(assignment_id: String) -> Result<String, ServerFnError> {
	use crate::feedback::issue_token;
	use crate::model::Assignment;
	use crate::schema::assignments;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::permissions::works_department_queue;
	use crate::web::state::AppState;
	use chrono::Utc;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let assignment: Option<Assignment> = assignments::table
		.find(&assignment_id)
		.first(&mut db_connection)
		.optional()?;
	let Some(assignment) = assignment else {
		return Err(ServerFnError::ServerError(String::from("No such assignment")));
	};

	if !works_department_queue(&mut db_connection, &user, &assignment.department)? {
		return Err(ServerFnError::ServerError(String::from("Permission denied")));
	}

	let token = issue_token(&mut db_connection, &assignment.id, &user.id, Utc::now())?;
	Ok(format!("{}/feedback/{}", state.config.web.base_url, token.token))
}
