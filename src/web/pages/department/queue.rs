// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::pages::errors::not_found::NotFound;
use crate::web::pages::utils::{DepartmentParams, format_occurrence_number, make_occurrence_url};
use chrono::{DateTime, Utc};
use leptos::ev::MouseEvent;
use leptos::prelude::*;
use leptos::task::spawn;
use leptos_router::hooks::use_params;
use serde::{Deserialize, Serialize};

#[component]
pub fn DepartmentQueue() -> impl IntoView {
	let params = use_params::<DepartmentParams>();
	let params = params.read();
	let params = params.as_ref().ok().cloned();

	let Some(params) = params else {
		return view! { <NotFound /> }.into_any();
	};
	let Some(department_id) = params.department.clone() else {
		return view! { <NotFound /> }.into_any();
	};

	let queue = Resource::new(|| (), {
		let department_id = department_id.clone();
		move |_| get_department_queue(department_id.clone())
	});
	let referral_departments = OnceResource::new(get_referral_departments());

	let (action_error, set_action_error): (ReadSignal<Option<String>>, WriteSignal<Option<String>>) = signal(None);

	view! {
		<Transition fallback=|| view! { <div id="department_queue_loading">"Loading queue..."</div> }>
			{
				move || match queue
					.read()
					.as_ref()
					.and_then(|queue| queue.as_ref().ok())
					.and_then(|queue| queue.as_ref())
				{
					Some(queue_data) => {
						let queue_data = queue_data.clone();
						view! {
							<h1 id="department_queue_name">{queue_data.department_name.clone()}</h1>
							{
								move || action_error.get().map(|error| view! {
									<div class="department_queue_error">{error}</div>
								})
							}
							<div id="department_queue_assignments">
								{
									if queue_data.assignments.is_empty() {
										view! {
											<div class="department_queue_empty">"Nothing in the queue"</div>
										}.into_any()
									} else {
										queue_data.assignments.iter().map(|assignment| {
											let (response_text, set_response_text) = signal(String::new());
											let (refer_department, set_refer_department) = signal(String::new());
											let (refer_note, set_refer_note) = signal(String::new());

											let acknowledge_id = assignment.id.clone();
											let acknowledge_click = move |_: MouseEvent| {
												let assignment_id = acknowledge_id.clone();
												spawn(async move {
													match acknowledge_assignment(assignment_id).await {
														Ok(()) => {
															set_action_error.set(None);
															queue.refetch();
														}
														Err(error) => set_action_error.set(Some(error.to_string())),
													}
												});
											};

											let complete_id = assignment.id.clone();
											let complete_click = move |_: MouseEvent| {
												let assignment_id = complete_id.clone();
												let response = response_text.get();
												if response.is_empty() {
													set_action_error.set(Some(String::from(
														"Completing an assignment needs a response",
													)));
													return;
												}
												spawn(async move {
													match complete_assignment(assignment_id, response).await {
														Ok(()) => {
															set_action_error.set(None);
															queue.refetch();
														}
														Err(error) => set_action_error.set(Some(error.to_string())),
													}
												});
											};

											let refer_id = assignment.id.clone();
											let refer_click = move |_: MouseEvent| {
												let assignment_id = refer_id.clone();
												let to_department = refer_department.get();
												if to_department.is_empty() {
													set_action_error.set(Some(String::from(
														"Select a department to refer to",
													)));
													return;
												}
												let note = refer_note.get();
												spawn(async move {
													match refer_assignment(assignment_id, to_department, note).await {
														Ok(()) => {
															set_action_error.set(None);
															queue.refetch();
														}
														Err(error) => set_action_error.set(Some(error.to_string())),
													}
												});
											};

											let is_open = assignment.status != "Completed";
											let is_pending = assignment.status == "Pending";

											view! {
												<div class="department_queue_assignment">
													<div class="department_queue_assignment_start">
														<a href={make_occurrence_url(&assignment.occurrence_id)}>
															{format_occurrence_number(assignment.occurrence_number)}
														</a>
														<span class="department_queue_assignment_category">
															{assignment.category_name.clone()}
														</span>
														<span class="department_queue_assignment_severity">
															{assignment.severity.clone()}
														</span>
														<span class="department_queue_assignment_status">
															{assignment.status.clone()}
														</span>
														<span class="department_queue_assignment_time">
															{assignment.created_at.to_rfc3339()}
														</span>
													</div>
													{
														assignment.referred_from_department.as_ref().map(|referrer| view! {
															<div class="department_queue_assignment_referral">
																"Referred from " {referrer.clone()}
															</div>
														})
													}
													{
														assignment.response.as_ref().map(|response| view! {
															<div class="department_queue_assignment_response">
																{response.clone()}
															</div>
														})
													}
													{
														is_pending.then(|| view! {
															<button type="button" on:click=acknowledge_click>
																"Acknowledge"
															</button>
														})
													}
													{
														is_open.then(|| view! {
															<div class="department_queue_assignment_actions">
																<div>
																	<textarea
																		placeholder="Response"
																		bind:value=(response_text, set_response_text)
																	/>
																	<button type="button" on:click=complete_click>
																		"Complete"
																	</button>
																</div>
																<div>
																	<Transition>
																		<select on:change:target=move |event| set_refer_department.set(event.target().value())>
																			<option value="">"Refer to..."</option>
																			{
																				move || match &referral_departments.read().as_ref().and_then(|departments| departments.as_ref().ok()) {
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
																	<input
																		type="text"
																		placeholder="Referral note"
																		bind:value=(refer_note, set_refer_note)
																	/>
																	<button type="button" on:click=refer_click>
																		"Refer"
																	</button>
																</div>
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

/// An assignment as shown in a department's queue
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct QueueAssignmentData {
	pub id: String,
	pub occurrence_id: String,
	pub occurrence_number: i32,
	pub category_name: String,
	pub severity: String,
	pub status: String,
	pub created_at: DateTime<Utc>,
	pub referred_from_department: Option<String>,
	pub response: Option<String>,
}

/// A department's queue: its name and work items, open ones first
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DepartmentQueueData {
	pub department_name: String,
	pub assignments: Vec<QueueAssignmentData>,
}

/// A department that an assignment can be referred to
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReferralDepartment {
	pub id: String,
	pub name: String,
}

/// Gets a department's queue.
///
/// Visible only to users who work the department's queue; everyone else gets the same
/// not-found response as a nonexistent department.
#[server]
async fn get_department_queue(department_id: String) -> Result<Option<DepartmentQueueData>, ServerFnError> {
	use crate::model::{Assignment, AssignmentStatus, Department, IncidentCategory, Occurrence};
	use crate::schema::{assignments, departments, incident_categories, occurrences};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::permissions::works_department_queue;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let department: Option<Department> = departments::table
		.find(&department_id)
		.first(&mut db_connection)
		.optional()?;
	let Some(department) = department else {
		return Ok(None);
	};

	if !works_department_queue(&mut db_connection, &user, &department.id)? {
		return Ok(None);
	}

	let mut rows: Vec<(Assignment, (Occurrence, IncidentCategory))> = assignments::table
		.inner_join(occurrences::table.inner_join(incident_categories::table))
		.filter(assignments::department.eq(&department.id))
		.load(&mut db_connection)?;

	// Open work first, newest first within each group.
	rows.sort_by(|(a, _), (b, _)| {
		let a_completed = a.status == AssignmentStatus::Completed;
		let b_completed = b.status == AssignmentStatus::Completed;
		a_completed.cmp(&b_completed).then(b.created_at.cmp(&a.created_at))
	});

	let mut assignment_list: Vec<QueueAssignmentData> = Vec::with_capacity(rows.len());
	for (assignment, (occurrence, category)) in rows {
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

		assignment_list.push(QueueAssignmentData {
			id: assignment.id,
			occurrence_id: occurrence.id,
			occurrence_number: occurrence.occurrence_number,
			category_name: category.name,
			severity: category.severity.to_string(),
			status: assignment.status.to_string(),
			created_at: assignment.created_at,
			referred_from_department,
			response: assignment.response,
		});
	}

	Ok(Some(DepartmentQueueData {
		department_name: department.name,
		assignments: assignment_list,
	}))
}

/// Gets the departments an assignment can be referred to.
#[server]
async fn get_referral_departments() -> Result<Vec<ReferralDepartment>, ServerFnError> {
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
		.map(|department| ReferralDepartment {
			id: department.id,
			name: department.name,
		})
		.collect())
}

/// Marks a pending assignment acknowledged.
#[server]
async fn acknowledge_assignment(assignment_id: String) -> Result<(), ServerFnError> {
	use crate::model::{Assignment, AssignmentStatus};
	use crate::schema::assignments;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::permissions::works_department_queue;
	use crate::web::state::AppState;
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
	if assignment.status != AssignmentStatus::Pending {
		return Err(ServerFnError::ServerError(String::from(
			"Only pending assignments can be acknowledged",
		)));
	}

	diesel::update(assignments::table.find(&assignment.id))
		.set(assignments::status.eq(AssignmentStatus::Acknowledged))
		.execute(&mut db_connection)?;

	Ok(())
}

/// Completes an assignment, recording the department's response.
#[server]
async fn complete_assignment(assignment_id: String, response: String) -> Result<(), ServerFnError> {
	use crate::model::{Assignment, AssignmentStatus};
	use crate::schema::assignments;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::permissions::works_department_queue;
	use crate::web::state::AppState;
	use chrono::Utc;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	if response.is_empty() {
		return Err(ServerFnError::ServerError(String::from(
			"Completing an assignment needs a response",
		)));
	}

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
	if assignment.status == AssignmentStatus::Completed {
		return Err(ServerFnError::ServerError(String::from(
			"The assignment was already completed",
		)));
	}

	diesel::update(assignments::table.find(&assignment.id))
		.set((
			assignments::status.eq(AssignmentStatus::Completed),
			assignments::response.eq(Some(response)),
			assignments::completed_at.eq(Some(Utc::now())),
		))
		.execute(&mut db_connection)?;

	Ok(())
}

/// Refers an assignment onward to another department.
///
/// The receiving department gets a fresh assignment pointing back at this one, and this one is
/// completed with the referral recorded as its response.
#[server]
async fn refer_assignment(assignment_id: String, to_department: String, note: String) -> Result<(), ServerFnError> {
	use crate::model::{Assignment, AssignmentStatus, Department, NotificationKind, Occurrence};
	use crate::notify::notify_department;
	use crate::schema::{assignments, departments, occurrences};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::pages::utils::format_occurrence_number;
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
	if assignment.status == AssignmentStatus::Completed {
		return Err(ServerFnError::ServerError(String::from(
			"Completed assignments can't be referred",
		)));
	}
	if to_department == assignment.department {
		return Err(ServerFnError::ServerError(String::from(
			"An assignment can't be referred to its own department",
		)));
	}

	let target: Option<Department> = departments::table
		.find(&to_department)
		.first(&mut db_connection)
		.optional()?;
	let Some(target) = target else {
		return Err(ServerFnError::ServerError(String::from("No such department")));
	};
	if !target.active {
		return Err(ServerFnError::ServerError(String::from(
			"That department can't receive new assignments",
		)));
	}

	let live_assignments: i64 = assignments::table
		.filter(
			assignments::occurrence
				.eq(&assignment.occurrence)
				.and(assignments::department.eq(&target.id))
				.and(assignments::status.ne(AssignmentStatus::Completed)),
		)
		.count()
		.get_result(&mut db_connection)?;
	if live_assignments > 0 {
		return Err(ServerFnError::ServerError(String::from(
			"That department is already assigned",
		)));
	}

	let source_department: Department = departments::table
		.find(&assignment.department)
		.first(&mut db_connection)?;
	let occurrence: Occurrence = occurrences::table
		.find(&assignment.occurrence)
		.first(&mut db_connection)?;

	let now = Utc::now();
	let referral_response = if note.is_empty() {
		format!("Referred to {}", target.name)
	} else {
		format!("Referred to {}: {}", target.name, note)
	};
	let new_assignment = Assignment {
		id: cuid2::create_id(),
		occurrence: assignment.occurrence.clone(),
		department: target.id.clone(),
		assigned_by: user.id.clone(),
		status: AssignmentStatus::Pending,
		referred_from: Some(assignment.id.clone()),
		response: None,
		created_at: now,
		completed_at: None,
	};

	db_connection.transaction(|db_connection| {
		diesel::insert_into(assignments::table)
			.values(&new_assignment)
			.execute(db_connection)?;

		diesel::update(assignments::table.find(&assignment.id))
			.set((
				assignments::status.eq(AssignmentStatus::Completed),
				assignments::response.eq(Some(referral_response.as_str())),
				assignments::completed_at.eq(Some(now)),
			))
			.execute(db_connection)?;

		let body = format!(
			"Occurrence {} was referred to {} by {}",
			format_occurrence_number(occurrence.occurrence_number),
			target.name,
			source_department.name
		);
		notify_department(
			db_connection,
			&target.id,
			&user.id,
			NotificationKind::ReferralReceived,
			&occurrence.id,
			Some(&new_assignment.id),
			&body,
			now,
		)?;

		Ok(())
	})
	.map_err(|error: diesel::result::Error| -> ServerFnError { ServerFnError::ServerError(error.to_string()) })?;

	Ok(())
}
