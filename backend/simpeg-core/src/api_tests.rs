// src/api_tests.rs

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::api::{router, AppState};
    use crate::clock::Clock;
    use crate::config::AppConfig;
    use crate::session::{ROLE_HEADER, USER_HEADER};
    use crate::storage::{KeyValueStorage, MemoryStorage};
    use crate::store::{RecordStore, DB_KEY};

    struct TestApp {
        app: Router,
        storage: MemoryStorage,
    }

    fn setup() -> TestApp {
        let storage = MemoryStorage::new();
        let store = RecordStore::open(
            Arc::new(storage.clone()),
            Clock::fixed("2024-05-20 09:00:00").unwrap(),
        )
        .unwrap();
        TestApp {
            app: router(AppState::new(store, AppConfig::default())),
            storage,
        }
    }

    enum As {
        Admin,
        User(&'static str),
        Nobody,
    }

    async fn call(app: &Router, who: As, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        match who {
            As::Admin => {
                builder = builder.header(USER_HEADER, "admin").header(ROLE_HEADER, "admin");
            }
            As::User(employee_id) => {
                builder = builder.header(USER_HEADER, employee_id).header(ROLE_HEADER, "user");
            }
            As::Nobody => {}
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn call_json(app: &Router, who: As, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, text) = call(app, who, method, uri, body).await;
        let value = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn health_needs_no_session() {
        let t = setup();
        let (status, body) = call_json(&t.app, As::Nobody, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn portals_enforce_session_and_role() {
        let t = setup();
        let (status, _) = call(&t.app, As::Nobody, Method::GET, "/api/admin/employees", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&t.app, As::User("e1"), Method::GET, "/api/admin/employees", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&t.app, As::Admin, Method::GET, "/api/me/profile", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = call(&t.app, As::User("e9"), Method::GET, "/api/me/profile", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn deleting_a_position_shows_placeholder_in_employee_list() {
        let t = setup();
        let (status, _) = call(&t.app, As::Admin, Method::DELETE, "/api/admin/positions/p2", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = call_json(&t.app, As::Admin, Method::GET, "/api/admin/employees", None).await;
        assert_eq!(status, StatusCode::OK);
        let budi = body
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["id"] == "e1")
            .unwrap();
        assert_eq!(budi["positionName"], "N/A");
    }

    #[tokio::test]
    async fn invalid_employee_is_rejected_with_field_errors() {
        let t = setup();
        let before = t.storage.get_item(DB_KEY).unwrap();

        let (status, body) = call_json(
            &t.app,
            As::Admin,
            Method::POST,
            "/api/admin/employees",
            Some(json!({ "name": "Tanpa Data" })),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["field"].as_str())
            .collect();
        assert!(fields.contains(&"nik"));
        assert!(fields.contains(&"birthDate"));
        assert_eq!(t.storage.get_item(DB_KEY).unwrap(), before);
    }

    #[tokio::test]
    async fn added_employee_gets_login_and_can_use_portal() {
        let t = setup();
        let (status, body) = call_json(
            &t.app,
            As::Admin,
            Method::POST,
            "/api/admin/employees",
            Some(json!({
                "nik": "7201010101010001",
                "name": "Rahmat Hidayat",
                "email": "rahmat@example.com",
                "positionId": "p5",
                "unitId": "u2",
                "tmt": "2023-01-02",
                "employmentStatus": "Harian",
                "status": "Aktif",
                "birthPlace": "Luwuk",
                "birthDate": "1999-09-09",
                "gender": "Laki-laki"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["pensionDate"], "2064-09-09");
        assert_eq!(body["positionName"], "Staff HRD");

        let (_, accounts) = call_json(&t.app, As::Admin, Method::GET, "/api/admin/accounts", None).await;
        assert!(accounts
            .as_array()
            .unwrap()
            .iter()
            .any(|a| a["identifier"] == "rahmat@example.com"));

        // The new login cannot be created twice
        let id = body["id"].as_str().unwrap().to_string();
        let (status, _) = call(
            &t.app,
            As::Admin,
            Method::POST,
            "/api/admin/accounts",
            Some(json!({ "role": "user", "employeeId": id })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_records_are_not_found() {
        let t = setup();
        let (status, _) = call(&t.app, As::Admin, Method::GET, "/api/admin/employees/e404", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &t.app,
            As::Admin,
            Method::PUT,
            "/api/admin/units/u404",
            Some(json!({ "name": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn org_chart_nests_positions() {
        let t = setup();
        let (status, forest) = call_json(&t.app, As::Admin, Method::GET, "/api/admin/org-chart", None).await;
        assert_eq!(status, StatusCode::OK);

        let roots = forest.as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["id"], "p1");
        assert_eq!(roots[0]["children"][0]["name"], "Manajer Teknik");
        assert_eq!(roots[0]["children"][0]["employee"]["name"], "Budi Santoso");
        assert!(roots[0]["employee"].is_null());

        let (_, outline) = call(&t.app, As::Admin, Method::GET, "/api/admin/org-chart?format=outline", None).await;
        assert!(outline.contains("Staff IT | Jabatan Kosong"));
    }

    #[tokio::test]
    async fn attendance_flow_updates_roster_and_report() {
        let t = setup();
        let (status, _) = call(
            &t.app,
            As::Admin,
            Method::PUT,
            "/api/admin/presences",
            Some(json!({ "employeeId": "e2", "date": "2024-05-21", "status": "Sakit" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, roster) = call_json(
            &t.app,
            As::Admin,
            Method::GET,
            "/api/admin/presences?date=2024-05-21",
            None,
        )
        .await;
        let rows = roster["rows"].as_array().unwrap();
        assert_eq!(rows[0]["status"], "Alpha");
        assert_eq!(rows[1]["status"], "Sakit");

        let (_, report) = call_json(
            &t.app,
            As::Admin,
            Method::GET,
            "/api/admin/presences/report?month=2024-05",
            None,
        )
        .await;
        assert_eq!(report["rows"][1]["Hadir"], 1);
        assert_eq!(report["rows"][1]["Sakit"], 1);

        let (status, csv) = call(
            &t.app,
            As::Admin,
            Method::GET,
            "/api/admin/presences/report.csv?month=2024-05",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(csv.starts_with("Nama Pegawai,Hadir,Sakit,Izin,Cuti,Alpha\n"));
        assert!(csv.contains("Citra Lestari,1,1,0,0,0"));

        let (status, _) = call(
            &t.app,
            As::Admin,
            Method::GET,
            "/api/admin/presences/report?month=2024-13",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn user_portal_shows_own_data_and_leave() {
        let t = setup();
        let (status, dash) = call_json(&t.app, As::User("e1"), Method::GET, "/api/me/dashboard", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dash["todayStatus"], "Hadir");
        assert_eq!(dash["positionName"], "Manajer Teknik");

        let (status, request) = call_json(
            &t.app,
            As::User("e1"),
            Method::POST,
            "/api/me/leave",
            Some(json!({ "startDate": "2024-06-10", "endDate": "2024-06-12", "reason": "Mudik" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(request["status"], "Pending");

        let (_, admin_dash) = call_json(&t.app, As::Admin, Method::GET, "/api/admin/dashboard", None).await;
        assert_eq!(admin_dash["pendingLeaveRequests"], 1);

        let uri = format!("/api/admin/leave/{}", request["id"].as_str().unwrap());
        let (status, decided) = call_json(
            &t.app,
            As::Admin,
            Method::PUT,
            &uri,
            Some(json!({ "status": "Disetujui" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(decided["status"], "Disetujui");

        let (_, own) = call_json(&t.app, As::User("e1"), Method::GET, "/api/me/leave", None).await;
        assert_eq!(own[0]["status"], "Disetujui");
        let (_, others) = call_json(&t.app, As::User("e2"), Method::GET, "/api/me/leave", None).await;
        assert!(others.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_returns_500_and_keeps_state() {
        let t = setup();
        t.storage.set_read_only(true);

        let (status, _) = call(
            &t.app,
            As::Admin,
            Method::POST,
            "/api/admin/pangkats",
            Some(json!({ "name": "Golongan IV/a" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (_, pangkats) = call_json(&t.app, As::Admin, Method::GET, "/api/admin/pangkats", None).await;
        assert_eq!(pangkats.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn documents_support_add_and_delete_only() {
        let t = setup();
        let (status, doc) = call_json(
            &t.app,
            As::Admin,
            Method::POST,
            "/api/admin/employees/e2/documents",
            Some(json!({ "name": "KTP", "fileUrl": "data:application/pdf;base64,AAAA" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/api/admin/employees/e2/documents/{}", doc["id"].as_str().unwrap());

        let (status, _) = call(&t.app, As::Admin, Method::PUT, &uri, Some(json!({ "name": "KTP baru" }))).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

        let (status, _) = call(&t.app, As::Admin, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
