use log::*;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct EventStreamParams {
    /// Number of event frames after which the server closes the stream.
    /// Absent, 0 or not a non-negative integer keeps the stream open until
    /// the client disconnects.
    #[param(value_type = Option<u64>)]
    count: Option<String>,
}

impl EventStreamParams {
    /// The requested quota. A value that does not parse as `u64` is ignored.
    pub(crate) fn count(&self) -> Option<u64> {
        let raw = self.count.as_deref()?;
        match raw.trim().parse::<u64>() {
            Ok(count) => Some(count),
            Err(e) => {
                warn!("Ignoring invalid count {:?}, streaming unbounded: {}", raw, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::Uri;

    fn count(uri: &str) -> Option<u64> {
        let uri: Uri = uri.parse().unwrap();
        let Query(params) = Query::<EventStreamParams>::try_from_uri(&uri).unwrap();
        params.count()
    }

    #[test]
    fn test_count_is_optional() {
        assert_eq!(count("/api/event"), None);
        assert_eq!(count("/api/event?count=3"), Some(3));
        assert_eq!(count("/api/event?count=0"), Some(0));
    }

    #[test]
    fn test_malformed_count_is_treated_as_absent() {
        for uri in [
            "/api/event?count=abc",
            "/api/event?count=-1",
            "/api/event?count=1.5",
            "/api/event?count=",
        ] {
            assert_eq!(count(uri), None, "{uri}");
        }
    }
}
