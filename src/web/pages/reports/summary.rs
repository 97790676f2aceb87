// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn;
use serde::{Deserialize, Serialize};

#[component]
pub fn ReportSummary() -> impl IntoView {
	let (from_date, set_from_date) = signal(String::new());
	let (to_date, set_to_date) = signal(String::new());
	let (report, set_report): (ReadSignal<Option<ReportData>>, WriteSignal<Option<ReportData>>) = signal(None);
	let (report_error, set_report_error): (ReadSignal<Option<String>>, WriteSignal<Option<String>>) = signal(None);

	let form_submit = move |event: SubmitEvent| {
		event.prevent_default();
		set_report_error.set(None);

		if from_date.with(|date| date.is_empty()) || to_date.with(|date| date.is_empty()) {
			set_report_error.set(Some(String::from("Pick both dates for the report range")));
			return;
		}

		spawn(async move {
			match get_report(from_date.get_untracked(), to_date.get_untracked()).await {
				Ok(report_data) => set_report.set(Some(report_data)),
				Err(error) => set_report_error.set(Some(error.to_string())),
			}
		});
	};

	view! {
		<h2>"Occurrence summary"</h2>
		<form id="report_range_form" on:submit=form_submit>
			<label>
				"From"
				<input type="date" bind:value=(from_date, set_from_date) />
			</label>
			<label>
				"To"
				<input type="date" bind:value=(to_date, set_to_date) />
			</label>
			<button type="submit">"Run report"</button>
		</form>
		{
			move || report_error.get().map(|error| view! {
				<div id="report_error">{error}</div>
			})
		}
		{
			move || report.get().map(|report_data| view! {
				<div id="report_results">
					<div id="report_total">
						"Occurrences in range: "
						{report_data.total_occurrences}
					</div>
					<div class="report_section">
						<h3>"By severity"</h3>
						<table>
							<tbody>
								{
									report_data.by_severity.iter().map(|row| view! {
										<tr>
											<td>{row.label.clone()}</td>
											<td>{row.count}</td>
										</tr>
									}.into_any()).collect::<Vec<_>>()
								}
							</tbody>
						</table>
					</div>
					<div class="report_section">
						<h3>"By category"</h3>
						<table>
							<tbody>
								{
									report_data.by_main_category.iter().map(|row| view! {
										<tr>
											<td>{row.label.clone()}</td>
											<td>{row.count}</td>
										</tr>
									}.into_any()).collect::<Vec<_>>()
								}
							</tbody>
						</table>
					</div>
					<div class="report_section">
						<h3>"Department workload"</h3>
						<table>
							<thead>
								<tr>
									<th>"Department"</th>
									<th>"Pending"</th>
									<th>"Acknowledged"</th>
									<th>"Completed"</th>
								</tr>
							</thead>
							<tbody>
								{
									report_data.department_workload.iter().map(|row| view! {
										<tr>
											<td>{row.department.clone()}</td>
											<td>{row.pending}</td>
											<td>{row.acknowledged}</td>
											<td>{row.completed}</td>
										</tr>
									}.into_any()).collect::<Vec<_>>()
								}
							</tbody>
						</table>
					</div>
				</div>
			})
		}
	}
}

/// A labeled count in a report section
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CountRow {
	pub label: String,
	pub count: i64,
}

/// A department's assignment counts by status
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DepartmentWorkloadRow {
	pub department: String,
	pub pending: i64,
	pub acknowledged: i64,
	pub completed: i64,
}

/// The date-ranged summary shown on the reports page
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportData {
	pub total_occurrences: i64,
	pub by_severity: Vec<CountRow>,
	pub by_main_category: Vec<CountRow>,
	pub department_workload: Vec<DepartmentWorkloadRow>,
}

/// Runs the date-ranged summary: occurrence counts by severity and main category, and
/// assignment counts by status per department.
#[server]
async fn get_report(from: String, to: String) -> Result<ReportData, ServerFnError> {
	use crate::model::{Assignment, AssignmentStatus, Department, IncidentCategory, Occurrence, SeverityLevel};
	use crate::schema::{assignments, departments, incident_categories, occurrences};
	use crate::web::pages::server_utils::require_request_user;
	use crate::web::permissions::{PermissionLevel, permission_level_for_user};
	use crate::web::state::AppState;
	use chrono::{NaiveDate, NaiveTime};
	use diesel::prelude::*;
	use std::collections::HashMap;

	let user = require_request_user().await?;

	let state: AppState = expect_context();
	let mut db_connection = state.db_connection_pool.get()?;

	let permission_level = permission_level_for_user(&mut db_connection, &user)?;
	if permission_level == PermissionLevel::Member {
		return Err(ServerFnError::ServerError(String::from("Permission denied")));
	}

	let from_date = NaiveDate::parse_from_str(&from, "%Y-%m-%d")
		.map_err(|_| -> ServerFnError { ServerFnError::ServerError(String::from("Invalid from date")) })?;
	let to_date = NaiveDate::parse_from_str(&to, "%Y-%m-%d")
		.map_err(|_| -> ServerFnError { ServerFnError::ServerError(String::from("Invalid to date")) })?;
	if to_date < from_date {
		return Err(ServerFnError::ServerError(String::from(
			"The report range ends before it starts",
		)));
	}

	let range_start = from_date.and_time(NaiveTime::MIN).and_utc();
	let range_end = to_date
		.succ_opt()
		.ok_or_else(|| -> ServerFnError { ServerFnError::ServerError(String::from("Invalid to date")) })?
		.and_time(NaiveTime::MIN)
		.and_utc();

	let reported: Vec<(Occurrence, IncidentCategory)> = occurrences::table
		.inner_join(incident_categories::table)
		.filter(
			occurrences::occurred_at
				.ge(range_start)
				.and(occurrences::occurred_at.lt(range_end)),
		)
		.load(&mut db_connection)?;

	let total_occurrences = reported.len() as i64;

	let mut severity_counts: HashMap<SeverityLevel, i64> = HashMap::new();
	for (_, category) in reported.iter() {
		*severity_counts.entry(category.severity).or_insert(0) += 1;
	}
	let mut by_severity: Vec<(SeverityLevel, i64)> = severity_counts.into_iter().collect();
	by_severity.sort_by_key(|(severity, _)| *severity);
	let by_severity = by_severity
		.into_iter()
		.map(|(severity, count)| CountRow {
			label: severity.to_string(),
			count,
		})
		.collect();

	// Occurrences are filed against leaves; the category breakdown rolls each one up to its
	// top-level category.
	let all_categories: Vec<IncidentCategory> = incident_categories::table.load(&mut db_connection)?;
	let mut main_category_counts: HashMap<String, i64> = HashMap::new();
	for (occurrence, _) in reported.iter() {
		let mut current_id = occurrence.category.clone();
		let root_name = loop {
			let Some(category) = all_categories.iter().find(|category| category.id == current_id) else {
				break None;
			};
			match &category.parent {
				Some(parent_id) => current_id = parent_id.clone(),
				None => break Some(category.name.clone()),
			}
		};
		if let Some(root_name) = root_name {
			*main_category_counts.entry(root_name).or_insert(0) += 1;
		}
	}
	let mut by_main_category: Vec<CountRow> = main_category_counts
		.into_iter()
		.map(|(label, count)| CountRow { label, count })
		.collect();
	by_main_category.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));

	let range_assignments: Vec<(Assignment, Department)> = assignments::table
		.inner_join(departments::table)
		.filter(
			assignments::created_at
				.ge(range_start)
				.and(assignments::created_at.lt(range_end)),
		)
		.load(&mut db_connection)?;

	let mut workload: HashMap<String, DepartmentWorkloadRow> = HashMap::new();
	for (assignment, department) in range_assignments {
		let row = workload
			.entry(department.id)
			.or_insert_with(|| DepartmentWorkloadRow {
				department: department.name,
				pending: 0,
				acknowledged: 0,
				completed: 0,
			});
		match assignment.status {
			AssignmentStatus::Pending => row.pending += 1,
			AssignmentStatus::Acknowledged => row.acknowledged += 1,
			AssignmentStatus::Completed => row.completed += 1,
		}
	}
	let mut department_workload: Vec<DepartmentWorkloadRow> = workload.into_values().collect();
	department_workload.sort_by(|a, b| a.department.cmp(&b.department));

	Ok(ReportData {
		total_occurrences,
		by_severity,
		by_main_category,
		department_workload,
	})
}
