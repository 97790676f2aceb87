// © 2025 the Meridian Health OVA Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use knus::Decode;
use miette::{IntoDiagnostic, Result};
use tokio::fs::read_to_string;

pub async fn parse_config(config_path: &str) -> Result<ConfigData> {
	let config_file_contents = read_to_string(config_path).await.into_diagnostic()?;
	let config = knus::parse(config_path, &config_file_contents)?;
	Ok(config)
}

#[derive(Debug, Decode)]
pub struct ConfigData {
	#[knus(child)]
	pub web: WebConfig,
	#[knus(child)]
	pub database: DatabaseConfig,
	#[knus(child)]
	pub sso: SsoConfig,
}

#[derive(Debug, Decode)]
pub struct WebConfig {
	/// The address and port the web server listens on
	#[knus(child, unwrap(argument))]
	pub bind_addr: String,
	/// The externally-visible base URL, used for OAuth redirects and shared feedback links
	#[knus(child, unwrap(argument))]
	pub base_url: String,
}

#[derive(Debug, Decode)]
pub struct DatabaseConfig {
	#[knus(child, unwrap(argument))]
	pub host: String,
	#[knus(child, unwrap(argument))]
	pub port: Option<u16>,
	#[knus(child, unwrap(argument))]
	pub username: String,
	#[knus(child, unwrap(argument))]
	pub password: String,
	#[knus(child, unwrap(argument))]
	pub database: String,
}

/// Settings for the organization's OAuth2 single sign-on
#[derive(Debug, Decode)]
pub struct SsoConfig {
	#[knus(child, unwrap(argument))]
	pub client_id: String,
	#[knus(child, unwrap(argument))]
	pub client_secret: String,
	#[knus(child, unwrap(argument))]
	pub auth_url: String,
	#[knus(child, unwrap(argument))]
	pub token_url: String,
	/// The endpoint from which user identity claims are fetched after login
	#[knus(child, unwrap(argument))]
	pub userinfo_url: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	const EXAMPLE_CONFIG: &str = r#"
web {
	bind-addr "127.0.0.1:3000"
	base-url "https://ova.example.org"
}
database {
	host "localhost"
	port 5432
	username "ova"
	password "hunter2"
	database "ova_report"
}
sso {
	client-id "ova-report"
	client-secret "secret"
	auth-url "https://sso.example.org/authorize"
	token-url "https://sso.example.org/token"
	userinfo-url "https://sso.example.org/userinfo"
}
"#;

	#[test]
	fn full_config_parses() {
		let config: ConfigData = knus::parse("config.kdl", EXAMPLE_CONFIG).expect("config should parse");
		assert_eq!(config.web.bind_addr, "127.0.0.1:3000");
		assert_eq!(config.web.base_url, "https://ova.example.org");
		assert_eq!(config.database.port, Some(5432));
		assert_eq!(config.database.database, "ova_report");
		assert_eq!(config.sso.userinfo_url, "https://sso.example.org/userinfo");
	}

	#[test]
	fn database_port_is_optional() {
		let config = EXAMPLE_CONFIG.replace("\tport 5432\n", "");
		let config: ConfigData = knus::parse("config.kdl", &config).expect("config should parse");
		assert_eq!(config.database.port, None);
	}

	#[test]
	fn missing_sso_section_is_rejected() {
		let config = EXAMPLE_CONFIG.split("sso {").next().unwrap().to_string();
		let result: Result<ConfigData, _> = knus::parse("config.kdl", &config);
		assert!(result.is_err());
	}
}
