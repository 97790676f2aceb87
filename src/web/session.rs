// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::model::Session;
use crate::schema::sessions;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::{SessionStore, session_store};

/// Session storage over the sessions table, so that web logins survive server restarts.
#[derive(Clone, Debug)]
pub struct DatabaseStore {
	db_connection_pool: Pool<ConnectionManager<PgConnection>>,
}

impl DatabaseStore {
	pub fn new(db_connection_pool: Pool<ConnectionManager<PgConnection>>) -> Self {
		Self { db_connection_pool }
	}

	fn connection(&self) -> session_store::Result<PooledConnection<ConnectionManager<PgConnection>>> {
		self.db_connection_pool
			.get()
			.map_err(|error| session_store::Error::Backend(format!("Couldn't get database connection: {}", error)))
	}

	/// Converts a tower-sessions record into its database representation.
	fn database_session(record: &Record) -> session_store::Result<Session> {
		let data = serde_json::to_string(&record.data)
			.map_err(|error| session_store::Error::Encode(format!("{:?}", error)))?;

		let expires: i64 = record
			.expiry_date
			.unix_timestamp_nanos()
			.try_into()
			.map_err(|error| session_store::Error::Backend(format!("Timestamp out of bounds: {}", error)))?;
		let expires = DateTime::from_timestamp_nanos(expires);

		Ok(Session {
			session_id: record.id.0.into(),
			data,
			expires,
		})
	}
}

#[async_trait]
impl SessionStore for DatabaseStore {
	async fn create(&self, record: &mut Record) -> session_store::Result<()> {
		let mut db_connection = self.connection()?;
		let new_session = Self::database_session(record)?;

		diesel::insert_into(sessions::table)
			.values(new_session)
			.execute(&mut db_connection)
			.map_err(|error| session_store::Error::Backend(format!("Failed to create new session: {}", error)))?;

		Ok(())
	}

	async fn save(&self, record: &Record) -> session_store::Result<()> {
		let mut db_connection = self.connection()?;
		let session = Self::database_session(record)?;

		diesel::update(sessions::table)
			.filter(sessions::session_id.eq(&session.session_id))
			.set((sessions::data.eq(&session.data), sessions::expires.eq(session.expires)))
			.execute(&mut db_connection)
			.map_err(|error| session_store::Error::Backend(format!("Failed to update session: {}", error)))?;

		Ok(())
	}

	async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
		let mut db_connection = self.connection()?;

		// Sweep out sessions that have passed their expiry so they can't be loaded again.
		let current_datetime = Utc::now();
		diesel::delete(sessions::table)
			.filter(sessions::expires.le(current_datetime))
			.execute(&mut db_connection)
			.map_err(|error| session_store::Error::Backend(format!("Failed to expire old sessions: {}", error)))?;

		let db_session_id: bigdecimal::BigDecimal = session_id.0.into();
		let db_result: QueryResult<Option<Session>> =
			sessions::table.find(db_session_id).first(&mut db_connection).optional();

		let session = match db_result {
			Ok(Some(session)) => session,
			Ok(None) => return Ok(None),
			Err(error) => {
				return Err(session_store::Error::Backend(format!(
					"Couldn't retrieve session from database: {}",
					error
				)));
			}
		};

		let data = serde_json::from_str(&session.data)
			.map_err(|error| session_store::Error::Decode(format!("{:?}", error)))?;
		let expiry_nanos = session
			.expires
			.timestamp_nanos_opt()
			.ok_or_else(|| session_store::Error::Backend(String::from("Out of range expiration timestamp")))?;
		let expiry_date = OffsetDateTime::from_unix_timestamp_nanos(expiry_nanos.into())
			.map_err(|error| session_store::Error::Backend(format!("Timestamp conversion error: {}", error)))?;

		Ok(Some(Record {
			id: *session_id,
			data,
			expiry_date,
		}))
	}

	async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
		let mut db_connection = self.connection()?;

		let db_session_id: bigdecimal::BigDecimal = session_id.0.into();
		diesel::delete(sessions::table)
			.filter(sessions::session_id.eq(db_session_id))
			.execute(&mut db_connection)
			.map_err(|error| session_store::Error::Backend(format!("Failed to delete session: {}", error)))?;

		Ok(())
	}
}
