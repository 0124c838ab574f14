use serde::Deserialize;
use uuid::Uuid;

use crate::errors::MeetingError;
use crate::session::MeetingConfig;

/// Response from the meeting provisioning API.
#[derive(Debug, Deserialize)]
struct ProvisionResponse {
    meeting: MeetingDescriptor,
    attendee: AttendeeDescriptor,
}

#[derive(Debug, Deserialize)]
struct MeetingDescriptor {
    meeting_id: String,
    #[serde(default)]
    media_region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttendeeDescriptor {
    attendee_id: String,
    join_token: String,
}

/// Requests meeting credentials from the provisioning API.
pub struct ProvisioningClient;

impl ProvisioningClient {
    /// Call the provisioning API to register one attendee in a meeting.
    ///
    /// `meeting_url` is a full URL like
    /// `https://meet.example.com/abc-defg-hij` or just
    /// `meet.example.com/abc-defg-hij`.
    pub async fn request_config(
        meeting_url: &str,
        display_name: Option<&str>,
    ) -> Result<MeetingConfig, MeetingError> {
        let (host, slug) = Self::parse_meeting_url(meeting_url)?;

        let external_id = Uuid::new_v4();
        let mut api_url =
            format!("https://{host}/api/v1.0/meetings/{slug}/attendees?external_id={external_id}");
        if let Some(name) = display_name {
            let encoded = urlencoding::encode(name);
            api_url.push_str(&format!("&display_name={encoded}"));
        }

        tracing::info!("requesting meeting credentials: {api_url}");

        let resp = reqwest::get(&api_url)
            .await
            .map_err(|e| MeetingError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MeetingError::Provision(format!(
                "provisioning API returned status {}",
                resp.status()
            )));
        }

        let data: ProvisionResponse = resp
            .json()
            .await
            .map_err(|e| MeetingError::Provision(format!("invalid provisioning response: {e}")))?;

        Ok(MeetingConfig {
            meeting_id: data.meeting.meeting_id,
            attendee_id: data.attendee.attendee_id,
            join_token: data.attendee.join_token,
            media_region: data.meeting.media_region,
        })
    }

    /// Extract and validate the meeting slug from user input.
    /// Accepts a full URL (`https://meet.example.com/abc-defg-hij`) or a
    /// bare slug (`abc-defg-hij`).
    /// Slug format: 3 lowercase + dash + 4 lowercase + dash + 3 lowercase.
    pub fn extract_slug(input: &str) -> Result<String, MeetingError> {
        let input = input.trim().trim_end_matches('/');
        let candidate = if input.contains('/') {
            input.rsplit('/').next().unwrap_or("")
        } else {
            input
        };
        let re = regex::Regex::new(r"^[a-z]{3}-[a-z]{4}-[a-z]{3}$").unwrap();
        if re.is_match(candidate) {
            Ok(candidate.to_string())
        } else {
            Err(MeetingError::InvalidUrl(format!(
                "invalid meeting slug format: '{candidate}'"
            )))
        }
    }

    /// Parse a meeting URL into (host, slug).
    fn parse_meeting_url(input: &str) -> Result<(String, String), MeetingError> {
        let trimmed = input.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(MeetingError::InvalidUrl("empty meeting url".to_string()));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };

        let parsed = url::Url::parse(&with_scheme)
            .map_err(|e| MeetingError::InvalidUrl(format!("'{input}': {e}")))?;

        let host = parsed
            .host_str()
            .ok_or_else(|| MeetingError::InvalidUrl(format!("missing host in '{input}'")))?
            .to_string();

        let slug = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .ok_or_else(|| MeetingError::InvalidUrl(format!("missing meeting slug in '{input}'")))?
            .to_string();

        Ok((host, slug))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_meeting_url_with_https() {
        let (host, slug) =
            ProvisioningClient::parse_meeting_url("https://meet.example.com/my-room").unwrap();
        assert_eq!(host, "meet.example.com");
        assert_eq!(slug, "my-room");
    }

    #[test]
    fn parse_meeting_url_without_scheme() {
        let (host, slug) =
            ProvisioningClient::parse_meeting_url("meet.example.com/room-123").unwrap();
        assert_eq!(host, "meet.example.com");
        assert_eq!(slug, "room-123");
    }

    #[test]
    fn parse_meeting_url_with_trailing_slash() {
        let (host, slug) =
            ProvisioningClient::parse_meeting_url("https://meet.example.com/my-room/").unwrap();
        assert_eq!(host, "meet.example.com");
        assert_eq!(slug, "my-room");
    }

    #[test]
    fn parse_meeting_url_nested_path_takes_last_segment() {
        let (host, slug) =
            ProvisioningClient::parse_meeting_url("https://meet.example.com/m/abc-defg-hij")
                .unwrap();
        assert_eq!(host, "meet.example.com");
        assert_eq!(slug, "abc-defg-hij");
    }

    #[test]
    fn parse_meeting_url_invalid() {
        assert!(ProvisioningClient::parse_meeting_url("invalid").is_err());
        assert!(ProvisioningClient::parse_meeting_url("").is_err());
    }

    #[test]
    fn extract_slug_from_full_url() {
        let slug =
            ProvisioningClient::extract_slug("https://meet.example.com/dpd-jffv-trg").unwrap();
        assert_eq!(slug, "dpd-jffv-trg");
    }

    #[test]
    fn extract_slug_from_bare_slug() {
        let slug = ProvisioningClient::extract_slug("dpd-jffv-trg").unwrap();
        assert_eq!(slug, "dpd-jffv-trg");
    }

    #[test]
    fn extract_slug_invalid_format() {
        assert!(ProvisioningClient::extract_slug("hello").is_err());
        assert!(ProvisioningClient::extract_slug("").is_err());
        assert!(ProvisioningClient::extract_slug("abc-defg-hi").is_err());
        assert!(ProvisioningClient::extract_slug("ABC-DEFG-HIJ").is_err());
    }

    #[test]
    fn extract_slug_from_url_with_trailing_slash() {
        let slug =
            ProvisioningClient::extract_slug("https://meet.example.com/abc-defg-hij/").unwrap();
        assert_eq!(slug, "abc-defg-hij");
    }
}
