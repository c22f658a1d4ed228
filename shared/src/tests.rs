#[cfg(test)]
mod tests {
    use serde_json::json;
    use crate::error::{ErrorCode, ErrorResponse};
    use crate::models::*;
    use crate::validation::*;

    fn request(destination: Option<&str>, voter: Option<&str>) -> RecordVoteRequest {
        RecordVoteRequest {
            destination_id: destination.map(String::from),
            voter_id: voter.map(String::from),
        }
    }

    #[test]
    fn test_valid_request() {
        let key = validate_vote_request(&request(Some("paris"), Some("u1"))).unwrap();
        assert_eq!(key.destination_id, "paris");
        assert_eq!(key.voter_id, "u1");
        assert_eq!(key.receipt_id(), "u1_paris");
    }

    #[test]
    fn test_missing_or_empty_fields() {
        for req in [
            request(None, Some("u1")),
            request(Some("paris"), None),
            request(Some(""), Some("u1")),
            request(Some("paris"), Some("")),
            request(None, None),
        ] {
            assert_eq!(validate_vote_request(&req), Err(ValidationError::MissingField));
        }
        assert_eq!(ValidationError::MissingField.to_string(), "Missing destinationId or voterId");
    }

    #[test]
    fn test_unaddressable_ids() {
        assert_eq!(
            validate_vote_request(&request(Some("a/b"), Some("u1"))),
            Err(ValidationError::ContainsSlash("destinationId"))
        );
        assert_eq!(
            validate_vote_request(&request(Some("paris"), Some(".."))),
            Err(ValidationError::ReservedId("voterId"))
        );
        assert_eq!(
            validate_vote_request(&request(Some("__name__"), Some("u1"))),
            Err(ValidationError::ReservedId("destinationId"))
        );
        let long = "x".repeat(MAX_ID_LENGTH + 1);
        assert_eq!(
            validate_vote_request(&request(Some("paris"), Some(&long))),
            Err(ValidationError::IdTooLong("voterId"))
        );
        assert!(validate_vote_request(&request(Some("_paris_"), Some("u_1"))).is_ok());
    }

    #[test]
    fn test_request_parsing() {
        let req: RecordVoteRequest =
            serde_json::from_value(json!({ "destinationId": "paris", "voterId": "u1" })).unwrap();
        assert_eq!(req, request(Some("paris"), Some("u1")));

        let partial: RecordVoteRequest = serde_json::from_value(json!({ "voterId": "u1" })).unwrap();
        assert_eq!(partial.destination_id, None);

        assert!(serde_json::from_value::<RecordVoteRequest>(json!({ "destinationId": 7 })).is_err());
    }

    #[test]
    fn test_response_shapes() {
        let recorded = RecordVoteResponse::from_outcome("paris", VoteOutcome::Recorded { new_count: 2 });
        assert_eq!(
            serde_json::to_value(&recorded).unwrap(),
            json!({ "success": true, "message": "Vote recorded for paris", "newCount": 2 })
        );

        let duplicate = RecordVoteResponse::from_outcome("paris", VoteOutcome::AlreadyVoted { current_count: 1 });
        assert_eq!(
            serde_json::to_value(&duplicate).unwrap(),
            json!({ "success": false, "message": "Already voted", "currentCount": 1 })
        );

        let parsed: RecordVoteResponse = serde_json::from_value(
            json!({ "success": false, "message": "Already voted", "currentCount": 4 })
        ).unwrap();
        assert_eq!(parsed, RecordVoteResponse::AlreadyVoted {
            success: false,
            message: ALREADY_VOTED_MESSAGE.into(),
            current_count: 4,
        });
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::InvalidRequest.status_code(), 400);
        assert_eq!(ErrorCode::MethodNotAllowed.status_code(), 405);
        assert_eq!(ErrorCode::StoreUnavailable.status_code(), 500);
        assert_eq!(ErrorCode::InternalError.status_code(), 500);
        assert_eq!(
            serde_json::to_value(ErrorResponse::new("boom")).unwrap(),
            json!({ "success": false, "error": "boom" })
        );
    }

    #[test]
    fn test_receipt_ids_are_unambiguous() {
        assert_eq!(receipt_id("u1", "paris"), "u1_paris");
        assert_eq!(receipt_id("a_b", "c"), "a%5Fb_c");
        assert_eq!(receipt_id("a", "b_c"), "a_b_c");
        assert_ne!(receipt_id("a_b", "c"), receipt_id("a", "b_c"));
        assert_ne!(receipt_id("a%5Fb", "c"), receipt_id("a_b", "c"));
        assert_ne!(receipt_id("x_", "y"), receipt_id("x", "_y"));
    }

    #[test]
    fn test_longest_receipt_id_fits_store_limit() {
        let voter = "%".repeat(MAX_ID_LENGTH);
        let destination = "d".repeat(MAX_ID_LENGTH);
        assert!(validate_vote_request(&request(Some(&destination), Some(&voter))).is_ok());
        assert!(receipt_id(&voter, &destination).len() <= 1500);
    }
}
