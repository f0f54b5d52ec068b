/*!
 * Integration tests for booking link handling
 *
 * Exercises the public codec and classifier API the way a caller would:
 * links copied from the booking page, hand-edited legacy links and
 * upstream failure envelopes.
 */

use gorzdrav::prelude::*;

const CANONICAL: &str = "https://gorzdrav.spb.ru/service-free-schedule#%5B%7B%22district%22:%225%22%7D,%7B%22lpu%22:%223%22%7D,%7B%22speciality%22:%2249351%22%7D,%7B%22schedule%22:%222229%22%7D,%7B%22doctor%22:%222229%22%7D%5D";

fn full(district: &str, lpu: i64, specialty: &str, doctor: &str) -> Identifiers {
    Identifiers::new(lpu, specialty)
        .with_district(district)
        .with_doctor(doctor)
}

#[test]
fn test_canonical_link_decodes() {
    let ids = parse(CANONICAL).expect("canonical link should parse");
    assert_eq!(ids.district_id.as_deref(), Some("5"));
    assert_eq!(ids.lpu_id, Some(3));
    assert_eq!(ids.specialty_id.as_deref(), Some("49351"));
    assert_eq!(ids.doctor_id.as_deref(), Some("2229"));
}

#[test]
fn test_canonical_link_encodes() {
    assert_eq!(generate(&full("5", 3, "49351", "2229")).unwrap(), CANONICAL);
}

#[test]
fn test_round_trip_for_assorted_identifiers() {
    let samples = [
        full("5", 3, "49351", "2229"),
        full("17", 0, "1", "0"),
        full("1", 123456, "ab-cd_9", "x.y~z"),
        full("Центральный", 42, "Терапевт", "Иванов"),
        full("a b", 7, "spec/slash", "doc?q"),
        full("5", 3, "49351", " 2229 "),
        full(" ", 3, "\t49351", "2229\n"),
    ];

    for ids in samples {
        let link = generate(&ids).unwrap();
        assert!(is_booking_link(&link), "{} should be a booking link", link);
        assert_eq!(parse(&link).unwrap(), ids, "round trip failed for {}", link);
        assert_eq!(generate(&parse(&link).unwrap()).unwrap(), link);
    }

    // An empty string cannot survive the trip, so it is refused up front
    let err = generate(&full("5", 3, "", "2229")).unwrap_err();
    assert!(matches!(err, GorzdravError::InvalidIdentifiers { .. }));
}

#[test]
fn test_already_decoded_fragment() {
    let url = r#"https://gorzdrav.spb.ru/service-free-schedule#[{"district":"5"},{"lpu":"3"},{"speciality":"49351"},{"schedule":"2229"},{"doctor":"2229"}]"#;
    assert_eq!(generate(&parse(url).unwrap()).unwrap(), CANONICAL);
}

#[test]
fn test_legacy_token_link_is_canonicalized() {
    let url = "https://gorzdrav.spb.ru/service-free-schedule#district=5&lpu=3&speciality=49351&schedule=2229";
    let ids = parse(url).unwrap();
    assert_eq!(ids, full("5", 3, "49351", "2229"));
    assert_eq!(ids.booking_link().unwrap(), CANONICAL);
}

#[test]
fn test_query_string_is_ignored_for_detection() {
    let url = CANONICAL.replace(
        "/service-free-schedule#",
        "/service-free-schedule?utm_source=telegram#",
    );
    assert!(is_booking_link(&url));
    assert_eq!(parse(&url).unwrap(), full("5", 3, "49351", "2229"));
}

#[test]
fn test_missing_lpu_is_a_negative_result() {
    let url = "https://gorzdrav.spb.ru/service-free-schedule#%5B%7B%22district%22:%225%22%7D,%7B%22speciality%22:%2249351%22%7D%5D";
    let err = parse(url).unwrap_err();
    assert!(matches!(err, GorzdravError::LinkNotRecognized { .. }));
    assert!(err.user_message().contains("Suggestion"));
}

#[test]
fn test_other_sites_are_not_links() {
    for url in [
        "https://gorzdrav.spb.ru/",
        "https://gorzdrav.spb.ru/service-free-schedule-old#%5B%5D",
        "https://zdrav.spb.ru/service-free-schedule#%5B%5D",
        "https://example.com/?next=gorzdrav.spb.ru/service-free-schedule",
    ] {
        assert!(!is_booking_link(url), "{} should not be a booking link", url);
        assert!(parse(url).is_err());
    }
}

#[test]
fn test_empty_identifiers_are_a_caller_error() {
    let err = generate(&Identifiers::default()).unwrap_err();
    assert!(matches!(err, GorzdravError::InvalidIdentifiers { .. }));
}

#[test]
fn test_failure_envelope_flows_into_library_error() {
    let envelope: ApiResponse<Vec<ApiDoctor>> = serde_json::from_str(
        r#"{"result":null,"success":false,"errorCode":38,"message":"Нет врачей","requestId":"1"}"#,
    )
    .unwrap();

    let err: GorzdravError = envelope.into_result().unwrap_err().into();
    match err.failure_condition() {
        Some(FailureCondition::NoDoctors { code, message }) => {
            assert_eq!(*code, 38);
            assert_eq!(message, "Нет врачей");
        }
        other => panic!("unexpected condition: {:?}", other),
    }
}

#[test]
fn test_classify_contract() {
    assert_eq!(
        classify(37, None),
        FailureCondition::NoSpecialties {
            code: 37,
            message: "no specialties available for this institution".to_string(),
        }
    );
    assert_eq!(
        classify(9999, Some("x")),
        FailureCondition::GenericUpstreamFailure {
            code: 9999,
            message: "x".to_string(),
        }
    );
}
