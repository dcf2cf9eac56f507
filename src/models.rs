//! Request payloads accepted by the document endpoints.
//!
//! Each type is built fresh per request by [`crate::validate::parse_body`]
//! and serialized straight into the template context.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validate::{self, FieldError, Loc, Schema};

/// Data printed on a participation certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub full_name: String,
    pub school: String,
    pub campaign_name: String,
    pub hours: i64,
    pub verification_code: String,
}

/// An event's activities and who attended which.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub event_title: String,
    pub activities: Vec<Activity>,
    pub enrollees: Vec<Enrollee>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
}

/// `attended_activity_ids` is not checked against the report's activities;
/// unknown ids are passed through to the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollee {
    pub name: String,
    pub code: String,
    pub attended_activity_ids: Vec<i64>,
}

impl Schema for CertificateRequest {
    fn check(value: &Value, loc: &[Loc], errors: &mut Vec<FieldError>) -> Option<Self> {
        let obj = validate::object(value, loc, errors)?;
        let full_name = validate::text_field(obj, "full_name", loc, errors);
        let school = validate::text_field(obj, "school", loc, errors);
        let campaign_name = validate::text_field(obj, "campaign_name", loc, errors);
        let hours = validate::int_field(obj, "hours", loc, errors);
        let verification_code = validate::text_field(obj, "verification_code", loc, errors);
        Some(Self {
            full_name: full_name?,
            school: school?,
            campaign_name: campaign_name?,
            hours: hours?,
            verification_code: verification_code?,
        })
    }
}

impl Schema for Activity {
    fn check(value: &Value, loc: &[Loc], errors: &mut Vec<FieldError>) -> Option<Self> {
        let obj = validate::object(value, loc, errors)?;
        let id = validate::int_field(obj, "id", loc, errors);
        let name = validate::text_field(obj, "name", loc, errors);
        Some(Self { id: id?, name: name? })
    }
}

impl Schema for Enrollee {
    fn check(value: &Value, loc: &[Loc], errors: &mut Vec<FieldError>) -> Option<Self> {
        let obj = validate::object(value, loc, errors)?;
        let name = validate::text_field(obj, "name", loc, errors);
        let code = validate::text_field(obj, "code", loc, errors);
        let attended_activity_ids =
            validate::list_field(obj, "attended_activity_ids", loc, errors, validate::integer);
        Some(Self {
            name: name?,
            code: code?,
            attended_activity_ids: attended_activity_ids?,
        })
    }
}

impl Schema for ReportRequest {
    fn check(value: &Value, loc: &[Loc], errors: &mut Vec<FieldError>) -> Option<Self> {
        let obj = validate::object(value, loc, errors)?;
        let event_title = validate::text_field(obj, "event_title", loc, errors);
        let activities = validate::list_field(obj, "activities", loc, errors, Activity::check);
        let enrollees = validate::list_field(obj, "enrollees", loc, errors, Enrollee::check);
        Some(Self {
            event_title: event_title?,
            activities: activities?,
            enrollees: enrollees?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::parse_body;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn valid_certificate() {
        let req: CertificateRequest = parse_body(&body(json!({
            "full_name": "Ana Ruiz",
            "school": "Lincoln HS",
            "campaign_name": "Reading Week",
            "hours": "12",
            "verification_code": "VC-001",
            "ignored": true
        })))
        .unwrap();
        assert_eq!(req.full_name, "Ana Ruiz");
        assert_eq!(req.hours, 12);
    }

    #[test]
    fn every_missing_field_is_reported() {
        let err = parse_body::<CertificateRequest>(&body(json!({"full_name": "Ana"}))).unwrap_err();
        let missing: Vec<_> = err
            .errors
            .iter()
            .map(|e| (e.loc.last().cloned(), e.kind.as_str()))
            .collect();
        assert_eq!(missing.len(), 4);
        assert!(missing.contains(&(Some(Loc::from("hours")), "missing")));
        assert!(missing.contains(&(Some(Loc::from("verification_code")), "missing")));
    }

    #[test]
    fn empty_strings_are_accepted() {
        let req: CertificateRequest = parse_body(&body(json!({
            "full_name": "", "school": "", "campaign_name": "", "hours": 0, "verification_code": ""
        })))
        .unwrap();
        assert_eq!(req.full_name, "");
    }

    #[test]
    fn nested_errors_are_located() {
        let err = parse_body::<ReportRequest>(&body(json!({
            "event_title": "Spring Fair",
            "activities": [{"id": 1, "name": "Opening"}, {"id": "one"}],
            "enrollees": [{"name": "Luis", "code": "E1", "attended_activity_ids": [1, null]}]
        })))
        .unwrap_err();
        let locs: Vec<Vec<Loc>> = err.errors.iter().map(|e| e.loc.clone()).collect();
        let key = |s: &str| Loc::from(s);
        assert!(locs.contains(&vec![key("body"), key("activities"), Loc::Index(1), key("id")]));
        assert!(locs.contains(&vec![key("body"), key("activities"), Loc::Index(1), key("name")]));
        assert!(locs.contains(&vec![
            key("body"),
            key("enrollees"),
            Loc::Index(0),
            key("attended_activity_ids"),
            Loc::Index(1)
        ]));
    }

    #[test]
    fn dangling_attendance_ids_pass() {
        let req: ReportRequest = parse_body(&body(json!({
            "event_title": "Spring Fair",
            "activities": [{"id": 1, "name": "Opening"}],
            "enrollees": [{"name": "Luis", "code": "E1", "attended_activity_ids": [99]}]
        })))
        .unwrap();
        assert_eq!(req.enrollees[0].attended_activity_ids, vec![99]);
    }

    #[test]
    fn schema_walk_matches_derived_fields() {
        let report = ReportRequest {
            event_title: "Spring Fair".into(),
            activities: vec![Activity { id: 1, name: "Opening".into() }],
            enrollees: vec![Enrollee {
                name: "Luis".into(),
                code: "E1".into(),
                attended_activity_ids: vec![1, 99],
            }],
        };
        let value = serde_json::to_value(&report).unwrap();
        let mut errors = Vec::new();
        let walked = ReportRequest::check(&value, &[Loc::from("body")], &mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(walked.as_ref(), Some(&report));
        assert_eq!(serde_json::from_value::<ReportRequest>(value).unwrap(), report);

        let certificate = CertificateRequest {
            full_name: "Ana Ruiz".into(),
            school: "Lincoln HS".into(),
            campaign_name: "Reading Week".into(),
            hours: 12,
            verification_code: "VC-001".into(),
        };
        let value = serde_json::to_value(&certificate).unwrap();
        let walked = CertificateRequest::check(&value, &[Loc::from("body")], &mut errors);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(walked, Some(certificate));
    }

    #[test]
    fn coercion_falls_back_to_schema_walk() {
        let req: CertificateRequest = parse_body(&body(json!({
            "full_name": "Ana Ruiz",
            "school": "Lincoln HS",
            "campaign_name": "Reading Week",
            "hours": 12.0,
            "verification_code": "VC-001"
        })))
        .unwrap();
        assert_eq!(req.hours, 12);

        let err = parse_body::<CertificateRequest>(&body(json!({
            "full_name": "Ana Ruiz",
            "school": "Lincoln HS",
            "campaign_name": "Reading Week",
            "hours": true,
            "verification_code": "VC-001"
        })))
        .unwrap_err();
        assert_eq!(err.errors[0].kind, "int_type");
    }

    #[test]
    fn malformed_json_and_wrong_root() {
        let err = parse_body::<ReportRequest>(b"{not json").unwrap_err();
        assert_eq!(err.errors[0].kind, "json_invalid");
        assert_eq!(err.errors[0].loc, vec![Loc::from("body")]);

        let err = parse_body::<ReportRequest>(b"[1, 2]").unwrap_err();
        assert_eq!(err.errors[0].kind, "object_type");
    }
}
