// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use fund_dashboard_core::errors::CoreError;

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn missing_credential() {
        let err = CoreError::MissingCredential("secret.json".into());
        assert_eq!(err.to_string(), "Credential file not found: secret.json");
    }

    #[test]
    fn missing_env_var() {
        let err = CoreError::MissingEnvVar("HTS_ID".into());
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: HTS_ID"
        );
    }

    #[test]
    fn handshake() {
        let err = CoreError::Handshake("token request failed".into());
        assert_eq!(err.to_string(), "Broker handshake failed: token request failed");
    }

    #[test]
    fn auth_expired() {
        let err = CoreError::AuthExpired("EGW00121: expired".into());
        assert_eq!(err.to_string(), "Broker session expired: EGW00121: expired");
    }

    #[test]
    fn api_error() {
        let err = CoreError::Api {
            broker: "KIS".into(),
            message: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "API error (KIS): rate limited");
    }

    #[test]
    fn network() {
        let err = CoreError::Network("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn file_io() {
        let err = CoreError::FileIO("permission denied".into());
        assert_eq!(err.to_string(), "File I/O error: permission denied");
    }
}

// ── Classification ──────────────────────────────────────────────────

mod classification {
    use super::*;

    #[test]
    fn only_auth_expired_reads_as_expired() {
        assert!(CoreError::AuthExpired("x".into()).is_auth_expired());
        assert!(!CoreError::Handshake("x".into()).is_auth_expired());
        assert!(!CoreError::Network("token mentioned here".into()).is_auth_expired());
        assert!(!CoreError::Api {
            broker: "KIS".into(),
            message: "auth mentioned here".into(),
        }
        .is_auth_expired());
    }
}

// ── From impls ──────────────────────────────────────────────────────

mod from_impls {
    use super::*;

    #[test]
    fn from_io_error_preserves_message() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let core_err: CoreError = io_err.into();
        match &core_err {
            CoreError::FileIO(msg) => assert!(msg.contains("file not found")),
            other => panic!("Expected FileIO, got {:?}", other),
        }
    }

    #[test]
    fn from_serde_json_error() {
        let result: Result<String, _> = serde_json::from_str("{{invalid json");
        let json_err = result.unwrap_err();
        let core_err: CoreError = json_err.into();
        match &core_err {
            CoreError::Deserialization(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Deserialization, got {:?}", other),
        }
    }

    #[test]
    fn from_serde_json_error_eof() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("");
        let json_err = result.unwrap_err();
        let core_err: CoreError = json_err.into();
        match &core_err {
            CoreError::Deserialization(msg) => assert!(msg.contains("EOF")),
            other => panic!("Expected Deserialization, got {:?}", other),
        }
    }
}

// ── Error is std::error::Error ──────────────────────────────────────

mod std_error {
    use super::*;

    #[test]
    fn core_error_implements_error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(CoreError::Handshake("test".into()));
        assert!(err.to_string().contains("test"));
    }

    #[test]
    fn core_error_implements_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<CoreError>();
        assert_sync::<CoreError>();
    }
}

// ── Edge cases ──────────────────────────────────────────────────────

mod edge_cases {
    use super::*;

    #[test]
    fn unicode_in_error_message() {
        let err = CoreError::Api {
            broker: "한국투자증권".into(),
            message: "모의투자 장시작전".into(),
        };
        assert_eq!(err.to_string(), "API error (한국투자증권): 모의투자 장시작전");
    }

    #[test]
    fn newlines_in_error_message() {
        let err = CoreError::FileIO("line1\nline2".into());
        assert!(err.to_string().contains("line1\nline2"));
    }
}
