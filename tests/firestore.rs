use mockito::{Matcher, Server};
use serde_json::json;
use tripsync_lib::{
    models::FieldPatch,
    records::{FirestoreRecordStore, RecordStore},
    settings::FirestoreSettings,
};

fn store_for(server: &Server, token: Option<&str>) -> FirestoreRecordStore {
    FirestoreRecordStore::new(
        reqwest::Client::new(),
        FirestoreSettings {
            base_url: format!("{}/v1", server.url()),
            project_id: "trip-demo".into(),
            collection: "trip_updates".into(),
            api_key: None,
            bearer_token: token.map(str::to_string),
        },
    )
}

#[tokio::test]
async fn patches_only_present_fields_with_update_mask() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock(
            "PATCH",
            Matcher::Regex(
                r"^/v1/projects/trip-demo/databases/.+/documents/trip_updates/rec-1$".into(),
            ),
        )
        .match_query(Matcher::Regex(
            r"^updateMask\.fieldPaths=locationName&updateMask\.fieldPaths=temp&currentDocument\.exists=true$"
                .into(),
        ))
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Json(json!({
            "fields": {
                "locationName": { "stringValue": "Bengaluru" },
                "temp": { "doubleValue": 27.5 }
            }
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let patch = FieldPatch {
        location_name: Some("Bengaluru".into()),
        aqi: None,
        temp: Some(27.5),
    };
    store_for(&server, Some("test-token"))
        .patch_fields("rec-1", &patch)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_patch_is_an_error() {
    let mut server = Server::new_async().await;
    server
        .mock("PATCH", Matcher::Regex("/documents/trip_updates/missing$".into()))
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"error":{"status":"NOT_FOUND"}}"#)
        .create_async()
        .await;

    let patch = FieldPatch {
        aqi: Some(42),
        ..Default::default()
    };
    let err = store_for(&server, None)
        .patch_fields("missing", &patch)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn missing_project_is_rejected_before_sending() {
    let store = FirestoreRecordStore::new(reqwest::Client::new(), FirestoreSettings::default());
    let patch = FieldPatch {
        aqi: Some(1),
        ..Default::default()
    };
    assert!(store.patch_fields("rec", &patch).await.is_err());
}
