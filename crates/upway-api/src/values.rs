// Current-value endpoint
//
// `POST /PrivateAPI/Values` with the system id and a repeated `variables`
// field. The portal keys its answer by variable id, not by position.

use serde::Deserialize;
use tracing::debug;

use crate::error::Error;
use crate::session::PortalSession;

/// Path of the private value-fetch endpoint.
pub const VALUES_PATH: &str = "/PrivateAPI/Values";

/// Body of a successful value fetch: `{ "Values": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValuesResponse {
    pub values: Vec<VariableValue>,
}

/// One `{ VariableId, CurrentValue }` record. Other fields the portal sends
/// along are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VariableValue {
    pub variable_id: u32,
    /// Raw display string (e.g. `"12.5°C"`, `"--"`, `"yes"`). `null` on the
    /// wire becomes `None`.
    #[serde(default)]
    pub current_value: Option<String>,
}

impl ValuesResponse {
    /// Decode a value-fetch body, keeping the raw body on failure.
    pub fn parse(status: u16, body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(|e| {
            let preview = body.char_indices().nth(200).map_or(body, |(i, _)| &body[..i]);
            Error::MalformedResponse {
                status,
                message: format!("{e} (body preview: {preview:?})"),
                body: body.to_owned(),
            }
        })
    }
}

impl PortalSession {
    /// Fetch the current value of every listed variable in one round trip.
    ///
    /// Goes through [`execute_authenticated`](Self::execute_authenticated),
    /// so an expired session is renewed once transparently.
    pub async fn fetch_values(&self, variable_ids: &[u32]) -> Result<Vec<VariableValue>, Error> {
        let url = self.base_url().join(VALUES_PATH)?;

        let mut form: Vec<(&str, String)> = Vec::with_capacity(variable_ids.len() + 1);
        form.push(("hpid", self.system_id().to_owned()));
        form.extend(variable_ids.iter().map(|id| ("variables", id.to_string())));

        debug!(count = variable_ids.len(), "POST {}", url);

        let resp = self
            .execute_authenticated(|http| http.post(url.clone()).form(&form))
            .await?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(Error::Transport)?;
        let parsed = ValuesResponse::parse(status, &body)?;

        debug!(returned = parsed.values.len(), "values fetched");
        Ok(parsed.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_values_and_ignores_extra_fields() {
        let body = r#"{
            "Values": [
                {"VariableId": 40004, "CurrentValue": "12.5°C", "Name": "BT1"},
                {"VariableId": 44703, "CurrentValue": "no"},
                {"VariableId": 43005, "CurrentValue": null}
            ],
            "IsOffline": false
        }"#;

        let parsed = ValuesResponse::parse(200, body).unwrap();
        assert_eq!(
            parsed.values,
            vec![
                VariableValue {
                    variable_id: 40004,
                    current_value: Some("12.5°C".into()),
                },
                VariableValue {
                    variable_id: 44703,
                    current_value: Some("no".into()),
                },
                VariableValue {
                    variable_id: 43005,
                    current_value: None,
                },
            ]
        );
    }

    #[test]
    fn missing_current_value_is_none() {
        let parsed = ValuesResponse::parse(200, r#"{"Values":[{"VariableId":1}]}"#).unwrap();
        assert_eq!(parsed.values[0].current_value, None);
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let err = ValuesResponse::parse(200, r#"{"values": []}"#).unwrap_err();
        match err {
            Error::MalformedResponse { status, body, .. } => {
                assert_eq!(status, 200);
                assert_eq!(body, r#"{"values": []}"#);
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn html_body_is_malformed() {
        let err = ValuesResponse::parse(500, "<html>oops</html>").unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { status: 500, .. }));
    }
}
