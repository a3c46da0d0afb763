//! The JSON envelope of the callable API.
//!
//! A call sends `{"data": <argument>}` and gets `{"result": <value>}` back on
//! success, or an error object (see [Error](crate::Error)'s `IntoResponse`
//! implementation) on failure.

use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

/// The body of a call.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableRequest {
    /// The argument of the call, `null` when there is none.
    #[serde(default)]
    pub data: Value,
}

impl CallableRequest {
    /// Parse a request body. An empty body is a call without an argument.
    ///
    /// # Errors
    /// Returns [Error::InvalidArgument] if the body is not a JSON object of
    /// the expected form.
    pub fn from_body(body: &Bytes) -> Result<Self, Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(body).map_err(|error| {
            Error::InvalidArgument(format!("the request body is not a valid call: {error}"))
        })
    }
}

/// The body of a successful call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableResponse<T> {
    /// The value returned by the call.
    pub result: T,
}

#[cfg(test)]
mod callable_request_tests {
    use axum::body::Bytes;
    use serde_json::{Value, json};

    use crate::{Error, callable::CallableRequest};

    #[test]
    fn parses_string_argument() {
        let body = Bytes::from_static(br#"{"data": "https://example.com/a.jpg"}"#);

        let request = CallableRequest::from_body(&body).unwrap();

        assert_eq!(request.data, json!("https://example.com/a.jpg"));
    }

    #[test]
    fn empty_body_has_null_argument() {
        for body in [Bytes::new(), Bytes::from_static(b" \n")] {
            assert_eq!(CallableRequest::from_body(&body).unwrap().data, Value::Null);
        }
    }

    #[test]
    fn missing_data_is_null() {
        let request = CallableRequest::from_body(&Bytes::from_static(b"{}")).unwrap();

        assert_eq!(request.data, Value::Null);
    }

    #[test]
    fn invalid_json_is_invalid_argument() {
        let result = CallableRequest::from_body(&Bytes::from_static(b"https://example.com"));

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }
}
