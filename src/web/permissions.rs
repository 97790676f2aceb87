// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PermissionLevel {
	Member,
	Coordinator,
	Admin,
}

impl Default for PermissionLevel {
	fn default() -> Self {
		Self::Member
	}
}

/// Resolves a user's permission level from their site role and department memberships.
///
/// A member of at least one department works that department's queue, which is coordinator
/// visibility even without the site-wide role.
#[cfg(feature = "ssr")]
pub fn level_from_parts(site_role: crate::model::SiteRole, department_count: i64) -> PermissionLevel {
	use crate::model::SiteRole;

	match site_role {
		SiteRole::Admin => PermissionLevel::Admin,
		SiteRole::Coordinator => PermissionLevel::Coordinator,
		SiteRole::Member => {
			if department_count > 0 {
				PermissionLevel::Coordinator
			} else {
				PermissionLevel::Member
			}
		}
	}
}

/// Gets a user's permission level.
#[cfg(feature = "ssr")]
pub fn permission_level_for_user(
	db_connection: &mut diesel::PgConnection,
	user: &crate::model::User,
) -> diesel::QueryResult<PermissionLevel> {
	use crate::schema::department_members;
	use diesel::prelude::*;

	let department_count: i64 = department_members::table
		.filter(department_members::user_id.eq(&user.id))
		.count()
		.get_result(db_connection)?;
	Ok(level_from_parts(user.site_role, department_count))
}

/// Whether a user works a department's queue: admins see every queue, everyone else needs
/// membership in the department.
#[cfg(feature = "ssr")]
pub fn works_department_queue(
	db_connection: &mut diesel::PgConnection,
	user: &crate::model::User,
	department_id: &str,
) -> diesel::QueryResult<bool> {
	use crate::model::SiteRole;
	use crate::schema::department_members;
	use diesel::dsl::count_star;
	use diesel::prelude::*;

	if user.site_role == SiteRole::Admin {
		return Ok(true);
	}

	let membership: i64 = department_members::table
		.filter(
			department_members::department
				.eq(department_id)
				.and(department_members::user_id.eq(&user.id)),
		)
		.select(count_star())
		.first(db_connection)?;
	Ok(membership > 0)
}

#[cfg(all(test, feature = "ssr"))]
mod tests {
	use super::*;
	use crate::model::SiteRole;

	#[test]
	fn site_roles_map_directly() {
		assert_eq!(level_from_parts(SiteRole::Admin, 0), PermissionLevel::Admin);
		assert_eq!(level_from_parts(SiteRole::Coordinator, 0), PermissionLevel::Coordinator);
		assert_eq!(level_from_parts(SiteRole::Member, 0), PermissionLevel::Member);
	}

	#[test]
	fn department_membership_grants_coordinator_visibility() {
		assert_eq!(level_from_parts(SiteRole::Member, 1), PermissionLevel::Coordinator);
		assert_eq!(level_from_parts(SiteRole::Member, 3), PermissionLevel::Coordinator);
	}

	#[test]
	fn membership_never_demotes_a_site_role() {
		assert_eq!(level_from_parts(SiteRole::Admin, 2), PermissionLevel::Admin);
	}
}
