// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::web::pages::utils::{format_occurrence_number, make_department_url, make_occurrence_url};
use crate::web::permissions::PermissionLevel;
use chrono::{DateTime, Utc};
use leptos::ev::MouseEvent;
use leptos::prelude::*;
use leptos::task::spawn;
use serde::{Deserialize, Serialize};

#[component]
pub fn Dashboard() -> impl IntoView {
	let permission_level = Resource::new(|| (), move |_| fetch_permission_level());
	let permission_level = move || {
		permission_level
			.read()
			.as_ref()
			.map(|level| level.clone().unwrap_or_default())
			.unwrap_or_default()
	};

	let user_occurrences = OnceResource::new(get_my_occurrences());
	let my_departments = OnceResource::new(get_my_departments());
	let notifications = Resource::new(|| (), move |_| get_unread_notifications());

	let mark_read_click = move |_: MouseEvent| {
		spawn(async move {
			let _ = mark_notifications_read().await;
			notifications.refetch();
		});
	};

	view! {
		<div id="dashboard_layout">
			<div id="dashboard_notifications">
				<Transition>
					{
						move || match &notifications.read().as_ref().and_then(|notifications| notifications.as_ref().ok()) {
							Some(notification_data) if !notification_data.is_empty() => {
								Some(view! {
									<h2>"Notifications"</h2>
									<ul class="dashboard_notification_list">
										{
											notification_data.iter().map(|notification|
												view! {
													<li>
														<a href={make_occurrence_url(&notification.occurrence_id)}>
															{notification.body.clone()}
														</a>
														<span class="dashboard_notification_time">
															{notification.created_at.to_rfc3339()}
														</span>
													</li>
												}.into_any()
											).collect::<Vec<_>>()
										}
									</ul>
									<button type="button" on:click=mark_read_click.clone()>
										"Mark all read"
									</button>
								})
							}
							_ => None
						}
					}
				</Transition>
			</div>
			<div id="dashboard_occurrences">
				<h2>"My occurrences"</h2>
				<Transition fallback=|| view! { <div class="dashboard_occurrence_list_loading">"Loading occurrences..."</div> }>
					<table class="dashboard_occurrence_list">
						<thead>
							<tr>
								<th>"Occurrence"</th>
								<th>"Category"</th>
								<th>"Severity"</th>
								<th>"Status"</th>
								<th>"Occurred"</th>
							</tr>
						</thead>
						<tbody>
							{
								move || match &user_occurrences.read().as_ref().and_then(|occurrences| occurrences.as_ref().ok()) {
									Some(occurrence_data) if !occurrence_data.is_empty() => {
										occurrence_data.iter().map(|occurrence|
											view! {
												<tr>
													<td>
														<a href={make_occurrence_url(&occurrence.id)}>
															{format_occurrence_number(occurrence.occurrence_number)}
														</a>
													</td>
													<td>{occurrence.category_name.clone()}</td>
													<td>{occurrence.severity.clone()}</td>
													<td>{occurrence.status.clone()}</td>
													<td>{occurrence.occurred_at.to_rfc3339()}</td>
												</tr>
											}.into_any()
										).collect::<Vec<_>>()
									}
									_ => {
										let no_occurrences_view = view! {
											<tr>
												<td colspan={5} class="dashboard_occurrence_list_empty">
													"No occurrences reported yet"
												</td>
											</tr>
										}.into_any();
										vec![no_occurrences_view]
									}
								}
							}
						</tbody>
					</table>
				</Transition>
				<a id="dashboard_report_link" href="/occurrence/new">"Report an occurrence"</a>
			</div>
			<Transition>
				<Show when=move || permission_level() != PermissionLevel::Member>
					<div id="dashboard_departments">
						<h2>"My departments"</h2>
						<Transition>
							{
								move || match &my_departments.read().as_ref().and_then(|departments| departments.as_ref().ok()) {
									Some(department_data) if !department_data.is_empty() => {
										Some(view! {
											<ul class="dashboard_department_list">
												{
													department_data.iter().map(|department|
														view! {
															<li>
																<a href={make_department_url(&department.id)}>
																	{department.name.clone()}
																</a>
																<span class="dashboard_department_open_count">
																	{department.open_assignments}
																	" open"
																</span>
															</li>
														}.into_any()
													).collect::<Vec<_>>()
												}
											</ul>
										})
									}
									_ => None
								}
							}
						</Transition>

						<Show when=move || permission_level() == PermissionLevel::Admin>
							<h2>"Admin"</h2>
							<ul>
								<li>
									<a href="/reports">"Reports"</a>
								</li>
							</ul>
						</Show>
					</div>
				</Show>
			</Transition>
		</div>
	}
}

#[server]
pub async fn fetch_permission_level() -> Result<PermissionLevel, ServerFnError> {
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::permissions::permission_level_for_user;
	use crate::web::state::AppState;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let permission_level = permission_level_for_user(&mut db_connection, &user)?;
	Ok(permission_level)
}

/// Information about the user's own occurrences for showing on the dashboard
#[derive(Debug, Deserialize, Serialize)]
pub struct MyOccurrenceMetadata {
	id: String,
	occurrence_number: i32,
	occurred_at: DateTime<Utc>,
	category_name: String,
	severity: String,
	status: String,
}

/// Gets all occurrences reported by the current user, newest first.
#[server]
async fn get_my_occurrences() -> Result<Vec<MyOccurrenceMetadata>, ServerFnError> {
	use crate::model::{IncidentCategory, Occurrence};
	use crate::schema::{incident_categories, occurrences};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let reported: Vec<(Occurrence, IncidentCategory)> = occurrences::table
		.inner_join(incident_categories::table)
		.filter(occurrences::reported_by.eq(&user.id))
		.order(occurrences::created_at.desc())
		.load(&mut db_connection)?;

	let occurrence_list = reported
		.into_iter()
		.map(|(occurrence, category)| MyOccurrenceMetadata {
			id: occurrence.id,
			occurrence_number: occurrence.occurrence_number,
			occurred_at: occurrence.occurred_at,
			category_name: category.name,
			severity: category.severity.to_string(),
			status: occurrence.status.to_string(),
		})
		.collect();

	Ok(occurrence_list)
}

/// A department the user belongs to, with its open workload
#[derive(Debug, Deserialize, Serialize)]
pub struct MyDepartmentMetadata {
	id: String,
	name: String,
	open_assignments: i64,
}

/// Gets the departments whose queues the current user works.
#[server]
async fn get_my_departments() -> Result<Vec<MyDepartmentMetadata>, ServerFnError> {
	use crate::model::{AssignmentStatus, Department};
	use crate::schema::{assignments, department_members, departments};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let member_departments: Vec<Department> = departments::table
		.inner_join(department_members::table)
		.filter(department_members::user_id.eq(&user.id))
		.select(departments::all_columns)
		.load(&mut db_connection)?;

	let mut department_list: Vec<MyDepartmentMetadata> = Vec::with_capacity(member_departments.len());
	for department in member_departments {
		let open_assignments: i64 = assignments::table
			.filter(
				assignments::department
					.eq(&department.id)
					.and(assignments::status.ne(AssignmentStatus::Completed)),
			)
			.count()
			.get_result(&mut db_connection)?;
		department_list.push(MyDepartmentMetadata {
			id: department.id,
			name: department.name,
			open_assignments,
		});
	}

	Ok(department_list)
}

/// An unread notification for showing on the dashboard
#[derive(Debug, Deserialize, Serialize)]
pub struct NotificationData {
	id: String,
	occurrence_id: String,
	body: String,
	created_at: DateTime<Utc>,
}

/// Gets the current user's unread notifications, newest first.
#[server]
async fn get_unread_notifications() -> Result<Vec<NotificationData>, ServerFnError> {
	use crate::model::Notification;
	use crate::schema::notifications;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let unread: Vec<Notification> = notifications::table
		.filter(
			notifications::recipient
				.eq(&user.id)
				.and(notifications::read_at.is_null()),
		)
		.order(notifications::created_at.desc())
		.load(&mut db_connection)?;

	let notification_list = unread
		.into_iter()
		.map(|notification| NotificationData {
			id: notification.id,
			occurrence_id: notification.occurrence,
			body: notification.body,
			created_at: notification.created_at,
		})
		.collect();

	Ok(notification_list)
}

/// Marks all of the current user's notifications read.
#[server]
async fn mark_notifications_read() -> Result<(), ServerFnError> {
	use crate::schema::notifications;
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::state::AppState;
	use diesel::prelude::*;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	diesel::update(notifications::table)
		.filter(
			notifications::recipient
				.eq(&user.id)
				.and(notifications::read_at.is_null()),
		)
		.set(notifications::read_at.eq(Some(Utc::now())))
		.execute(&mut db_connection)?;

	Ok(())
}
