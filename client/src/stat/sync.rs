use super::error::GatewayError;
use super::session::Session;
use crate::config::Config;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, warn};
use xp_stat::{RawTransaction, coerce_amount, find_unordered};

const PROFILE_QUERY: &str = r#"
query GetProfile {
  user {
    id
    login
    email
  }
}
"#;

const XP_QUERY: &str = r#"
query GetAccurateXP {
  transaction(
    where: {
      type: { _eq: "xp" }
      _or: [
        { path: { _nlike: "%piscine%" } }
        { object: { type: { _eq: "piscine" } } }
      ]
    }
    order_by: { createdAt: asc }
  ) {
    amount
    createdAt
    object { name }
  }
}
"#;

const XP_RANGE_QUERY: &str = r#"
query GetXPRange($from: timestamptz!, $to: timestamptz!) {
  total: transaction_aggregate(
    where: {
      type: { _eq: "xp" }
      _or: [
        { path: { _nlike: "%piscine%" } }
        { object: { type: { _eq: "piscine" } } }
      ]
      createdAt: { _gte: $from, _lt: $to }
    }
  ) {
    aggregate {
      sum { amount }
      count
    }
  }

  rows: transaction(
    where: {
      type: { _eq: "xp" }
      _or: [
        { path: { _nlike: "%piscine%" } }
        { object: { type: { _eq: "piscine" } } }
      ]
      createdAt: { _gte: $from, _lt: $to }
    }
    order_by: { createdAt: asc }
  ) {
    amount
    createdAt
    object { name }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub display_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Clouduser {
    pub id: i64,
    pub login: Option<String>,
    pub email: Option<String>,
}
impl From<Clouduser> for Identity {
    fn from(v: Clouduser) -> Self {
        Self {
            id: v.id,
            display_name: v.login.unwrap_or_default(),
            email: v.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cloudobject {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cloudtransaction {
    #[serde(default)]
    pub amount: Value,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(default)]
    pub object: Option<Cloudobject>,
}
impl TryFrom<Cloudtransaction> for RawTransaction {
    type Error = GatewayError;

    fn try_from(v: Cloudtransaction) -> Result<Self, Self::Error> {
        let created_at = DateTime::parse_from_rfc3339(&v.created_at)
            .map_err(|e| {
                GatewayError::DataShape(format!("bad createdAt {:?}: {e}", v.created_at))
            })?
            .with_timezone(&Utc);
        Ok(Self {
            amount: v.amount,
            created_at,
            object_name: v.object.and_then(|o| o.name),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Cloudprofile {
    #[serde(default)]
    user: Option<Vec<Clouduser>>,
}

#[derive(Debug, Deserialize)]
struct Cloudxp {
    #[serde(default)]
    transaction: Option<Vec<Cloudtransaction>>,
}

#[derive(Debug, Deserialize)]
struct Cloudrange {
    #[serde(default)]
    total: Option<Cloudaggregatewrap>,
    #[serde(default)]
    rows: Option<Vec<Cloudtransaction>>,
}

#[derive(Debug, Deserialize)]
struct Cloudaggregatewrap {
    #[serde(default)]
    aggregate: Option<Cloudaggregate>,
}

#[derive(Debug, Deserialize)]
struct Cloudaggregate {
    #[serde(default)]
    sum: Option<Cloudsum>,
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Deserialize)]
struct Cloudsum {
    #[serde(default)]
    amount: Value,
}

#[derive(Debug, Deserialize)]
struct Graphqlresponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<Graphqlerror>>,
}

#[derive(Debug, Deserialize)]
struct Graphqlerror {
    message: String,
    #[serde(default)]
    extensions: Option<Value>,
}

/// Server-side aggregate and rows for one time window.
#[derive(Debug, Clone)]
pub struct RangeReport {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub server_total: f64,
    pub server_count: u64,
    pub rows: Vec<RawTransaction>,
}

/// Exchanges credentials for a session token.
pub async fn signin(config: &Config, identifier: &str, password: &str) -> Result<Session, GatewayError> {
    let client = Client::new();
    let resp = client
        .post(&config.signin_url)
        .basic_auth(identifier, Some(password))
        .send()
        .await?;
    let status = resp.status();
    let is_json = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));
    let body = resp.text().await?;

    if !status.is_success() {
        let message = signin_failure_message(status, is_json, &body);
        warn!(status = status.as_u16(), "sign-in rejected");
        return Err(if status.is_server_error() {
            GatewayError::Server {
                status: status.as_u16(),
                message,
            }
        } else {
            GatewayError::Auth(message)
        });
    }

    let token = extract_token(is_json, &body)?;
    if token.is_empty() {
        return Err(GatewayError::Auth("sign-in returned an empty token".into()));
    }
    debug!("sign-in succeeded");
    Ok(Session::new(token))
}

fn signin_failure_message(status: StatusCode, is_json: bool, body: &str) -> String {
    let fallback = format!("Login failed (HTTP {})", status.as_u16());
    if is_json {
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
            return fallback;
        };
        ["error", "message"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or(fallback)
    } else if body.trim().is_empty() {
        fallback
    } else {
        body.trim().to_string()
    }
}

fn extract_token(is_json: bool, body: &str) -> Result<String, GatewayError> {
    if !is_json {
        return Ok(body.trim().to_string());
    }
    let value: Value = serde_json::from_str(body)?;
    let token = match &value {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["jwt", "token"]
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        _ => value.to_string(),
    };
    Ok(token.trim().to_string())
}

fn classify_graphql_error(status: StatusCode, err: Graphqlerror) -> GatewayError {
    let code = err
        .extensions
        .as_ref()
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if matches!(code, "invalid-jwt" | "invalid-headers") || err.message.contains("JWT") {
        GatewayError::Auth(err.message)
    } else {
        GatewayError::Server {
            status: status.as_u16(),
            message: err.message,
        }
    }
}

fn into_ordered(rows: Vec<Cloudtransaction>) -> Result<Vec<RawTransaction>, GatewayError> {
    let transactions = rows
        .into_iter()
        .map(RawTransaction::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(idx) = find_unordered(&transactions) {
        warn!(index = idx, "XP feed is not sorted by createdAt");
        return Err(GatewayError::DataShape(format!(
            "transaction #{idx} is older than the one before it"
        )));
    }
    Ok(transactions)
}

/// GraphQL access on behalf of one signed-in user.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    graphql_url: String,
    session: Session,
}

impl Gateway {
    pub fn new(config: &Config, session: Session) -> Self {
        Self {
            client: Client::new(),
            graphql_url: config.graphql_url.clone(),
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    async fn graphql<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, GatewayError> {
        let resp = self
            .client
            .post(&self.graphql_url)
            .bearer_auth(&self.session.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Auth(
                format!("HTTP {} {}", status.as_u16(), body.trim()).trim().to_string(),
            ));
        }
        if !status.is_success() {
            return Err(GatewayError::Server {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        let envelope: Graphqlresponse = serde_json::from_str(&body)?;
        if let Some(first) = envelope.errors.unwrap_or_default().into_iter().next() {
            return Err(classify_graphql_error(status, first));
        }
        let data = envelope
            .data
            .filter(|d| !d.is_null())
            .ok_or_else(|| GatewayError::DataShape("GraphQL response carried no data".into()))?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn fetch_identity(&self) -> Result<Identity, GatewayError> {
        let profile: Cloudprofile = self.graphql(PROFILE_QUERY, Value::Null).await?;
        profile
            .user
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(Identity::from)
            .ok_or_else(|| GatewayError::DataShape("profile query returned no user".into()))
    }

    /// All XP grants, oldest first.
    pub async fn fetch_transactions(&self) -> Result<Vec<RawTransaction>, GatewayError> {
        let xp: Cloudxp = self.graphql(XP_QUERY, Value::Null).await?;
        let transactions = into_ordered(xp.transaction.unwrap_or_default())?;
        debug!(count = transactions.len(), "fetched XP transactions");
        Ok(transactions)
    }

    /// XP granted in `[from, to)`, with the server's own sum and count.
    pub async fn fetch_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<RangeReport, GatewayError> {
        let variables = json!({ "from": from.to_rfc3339(), "to": to.to_rfc3339() });
        let range: Cloudrange = self.graphql(XP_RANGE_QUERY, variables).await?;
        let aggregate = range.total.and_then(|t| t.aggregate);
        let server_count = aggregate.as_ref().map(|a| a.count).unwrap_or(0);
        let server_total = aggregate
            .and_then(|a| a.sum)
            .map(|s| coerce_amount(&s.amount))
            .unwrap_or(0.0);
        let rows = into_ordered(range.rows.unwrap_or_default())?;
        debug!(count = rows.len(), server_count, "fetched XP range");
        Ok(RangeReport {
            from,
            to,
            server_total,
            server_count,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_from_json_string_or_field() {
        assert_eq!(extract_token(true, r#""abc.def""#).unwrap(), "abc.def");
        assert_eq!(extract_token(true, r#"{"jwt":"j1"}"#).unwrap(), "j1");
        assert_eq!(extract_token(true, r#"{"token":"t1"}"#).unwrap(), "t1");
        assert_eq!(extract_token(true, r#"{"jwt":"","token":"t2"}"#).unwrap(), "t2");
        assert_eq!(extract_token(true, r#"{"other":1}"#).unwrap(), r#"{"other":1}"#);
        assert_eq!(extract_token(false, " raw-token \n").unwrap(), "raw-token");
    }

    #[test]
    fn broken_json_token_is_a_shape_error() {
        assert!(matches!(
            extract_token(true, "{not json"),
            Err(GatewayError::DataShape(_))
        ));
    }

    #[test]
    fn signin_failure_messages() {
        let status = StatusCode::UNAUTHORIZED;
        assert_eq!(
            signin_failure_message(status, true, r#"{"error":"User does not exist or password incorrect"}"#),
            "User does not exist or password incorrect"
        );
        assert_eq!(signin_failure_message(status, true, r#"{"message":"nope"}"#), "nope");
        assert_eq!(signin_failure_message(status, true, "garbage"), "Login failed (HTTP 401)");
        assert_eq!(signin_failure_message(status, false, "denied"), "denied");
        assert_eq!(signin_failure_message(status, false, ""), "Login failed (HTTP 401)");
    }

    #[test]
    fn jwt_errors_are_auth_errors() {
        let jwt = Graphqlerror {
            message: "Could not verify JWT: JWTExpired".into(),
            extensions: Some(json!({"code": "invalid-jwt"})),
        };
        assert!(classify_graphql_error(StatusCode::OK, jwt).is_auth());

        let other = Graphqlerror {
            message: "field 'foo' not found".into(),
            extensions: Some(json!({"code": "validation-failed"})),
        };
        assert!(matches!(
            classify_graphql_error(StatusCode::OK, other),
            GatewayError::Server { status: 200, .. }
        ));
    }

    #[test]
    fn wire_transaction_converts() {
        let wire: Cloudtransaction = serde_json::from_value(json!({
            "amount": 24500,
            "createdAt": "2024-03-18T09:12:44.123+00:00",
            "object": { "name": "go-reloaded" }
        }))
        .unwrap();
        let tx = RawTransaction::try_from(wire).unwrap();
        assert_eq!(tx.amount, json!(24500));
        assert_eq!(tx.object_name.as_deref(), Some("go-reloaded"));
        assert_eq!(tx.created_at.to_rfc3339(), "2024-03-18T09:12:44.123+00:00");

        let orphan: Cloudtransaction = serde_json::from_value(json!({
            "amount": null,
            "createdAt": "2024-03-18T09:12:44Z",
            "object": null
        }))
        .unwrap();
        assert_eq!(RawTransaction::try_from(orphan).unwrap().entity_name(), "Unknown");
    }

    #[test]
    fn bad_timestamp_is_a_shape_error() {
        let wire: Cloudtransaction = serde_json::from_value(json!({
            "amount": 1,
            "createdAt": "yesterday"
        }))
        .unwrap();
        assert!(matches!(
            RawTransaction::try_from(wire),
            Err(GatewayError::DataShape(_))
        ));
    }
}
