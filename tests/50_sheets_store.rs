use anyhow::Result;
use httpmock::prelude::*;
use serde_json::json;

use member_directory::sheets::{ServiceAccountKey, SheetsClient, SheetsStore, TokenSource};
use member_directory::store::{DirectoryStore, StoreError};
use member_directory::types::{Member, UpsertOutcome};

const SHEET: &str = "/v4/spreadsheets/sheet-1/values";
const TOKEN: &str = "static-token";

fn store(server: &MockServer, tokens: TokenSource) -> Result<SheetsStore> {
    let client = SheetsClient::new(&server.base_url(), "sheet-1", tokens)?;
    Ok(SheetsStore::new(client, "Sheet1", "Groups"))
}

fn static_store(server: &MockServer) -> Result<SheetsStore> {
    store(server, TokenSource::Static(TOKEN.to_string()))
}

fn member(email: &str) -> Member {
    Member {
        name: "Ann Nowak".into(),
        law_firm: "Nowak & Co".into(),
        email: email.into(),
        phone: None,
        country: "Poland".into(),
        groups: vec!["Tax".into(), "IP".into()],
    }
}

async fn mock_member_header(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("{}/Sheet1!A1:F1", SHEET))
                .header("authorization", format!("Bearer {}", TOKEN));
            then.status(200).json_body(json!({
                "range": "Sheet1!A1:F1",
                "values": [["NAME", "LAW FIRM", "E-MAIL", "PHONE", "COUNTRY", "GROUP"]]
            }));
        })
        .await
}

async fn mock_group_header(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Groups!A1:A1", SHEET));
            then.status(200).json_body(json!({ "values": [["GROUP"]] }));
        })
        .await
}

#[tokio::test]
async fn upsert_updates_first_row_of_duplicated_email() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!C2:C", SHEET));
            then.status(200).json_body(json!({
                "values": [["bob@nowak.pl"], ["ANN@nowak.pl"], [], ["ann@nowak.pl"]]
            }));
        })
        .await;
    let update = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path(format!("{}/Sheet1!A3:F3", SHEET))
                .query_param("valueInputOption", "RAW")
                .json_body_partial(
                    json!({
                        "values": [["Ann Nowak", "Nowak & Co", "ann@nowak.pl", "", "Poland", "Tax, IP"]]
                    })
                    .to_string(),
                );
            then.status(200).json_body(json!({ "updatedRows": 1 }));
        })
        .await;

    let outcome = static_store(&server)?.upsert_member(&member("ann@nowak.pl")).await?;

    assert_eq!(outcome, UpsertOutcome::Updated);
    update.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn upsert_appends_missing_email() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!C2:C", SHEET));
            then.status(200).json_body(json!({ "values": [["bob@nowak.pl"]] }));
        })
        .await;
    let append = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(format!("{}/Sheet1!A:F:append", SHEET))
                .query_param("valueInputOption", "RAW")
                .query_param("insertDataOption", "INSERT_ROWS");
            then.status(200).json_body(json!({}));
        })
        .await;

    let outcome = static_store(&server)?.upsert_member(&member("new@nowak.pl")).await?;

    assert_eq!(outcome, UpsertOutcome::Created);
    append.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn missing_header_is_written_before_reading() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A1:F1", SHEET));
            then.status(200).json_body(json!({ "range": "Sheet1!A1:F1" }));
        })
        .await;
    let header = server
        .mock_async(|when, then| {
            when.method(PUT).path(format!("{}/Sheet1!A1:F1", SHEET)).json_body_partial(
                json!({ "values": [["NAME", "LAW FIRM", "E-MAIL", "PHONE", "COUNTRY", "GROUP"]] }).to_string(),
            );
            then.status(200).json_body(json!({}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A2:F", SHEET));
            then.status(200).json_body(json!({}));
        })
        .await;

    let members = static_store(&server)?.list_members().await?;

    assert!(members.is_empty());
    header.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn list_members_keeps_first_of_duplicates() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A2:F", SHEET));
            then.status(200).json_body(json!({
                "values": [
                    ["Ann Nowak", "Nowak & Co", "Ann@Nowak.pl", "", "Poland", "Tax; IP"],
                    ["", "", "", "", "", ""],
                    ["Ann Copy", "Copy LLP", "ann@nowak.pl", "", "Poland", "Tax"],
                    ["Bob Kowal", "Kowal", "bob@nowak.pl", "+48 1", "Poland", "IP"]
                ]
            }));
        })
        .await;

    let members = static_store(&server)?.list_members().await?;

    assert_eq!(members.len(), 2);
    assert_eq!(members[0].name, "Ann Nowak");
    assert_eq!(members[0].email, "ann@nowak.pl");
    assert_eq!(members[0].groups, vec!["Tax", "IP"]);
    assert_eq!(members[1].phone.as_deref(), Some("+48 1"));
    Ok(())
}

#[tokio::test]
async fn rename_group_batches_group_and_member_cells() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    mock_group_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Groups!A2:A", SHEET));
            then.status(200).json_body(json!({ "values": [["IP"], ["Tax"]] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A2:F", SHEET));
            then.status(200).json_body(json!({
                "values": [
                    ["Ann", "A", "ann@nowak.pl", "", "PL", "Tax, IP"],
                    ["Bob", "B", "bob@nowak.pl", "", "PL", "IP"]
                ]
            }));
        })
        .await;
    let batch = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v4/spreadsheets/sheet-1/values:batchUpdate")
                .json_body(json!({
                    "valueInputOption": "RAW",
                    "data": [
                        { "range": "Groups!A3", "values": [["Taxation"]] },
                        { "range": "Sheet1!F2", "values": [["Taxation, IP"]] }
                    ]
                }));
            then.status(200).json_body(json!({}));
        })
        .await;

    let touched = static_store(&server)?.rename_group("Tax", "Taxation").await?;

    assert_eq!(touched, 1);
    batch.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn delete_group_in_use_is_refused() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    mock_group_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Groups!A2:A", SHEET));
            then.status(200).json_body(json!({ "values": [["Tax"]] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A2:F", SHEET));
            then.status(200).json_body(json!({
                "values": [["Ann", "A", "ann@nowak.pl", "", "PL", "Tax"]]
            }));
        })
        .await;
    let clear = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("{}/Groups!A2:clear", SHEET));
            then.status(200).json_body(json!({}));
        })
        .await;

    let result = static_store(&server)?.delete_group("Tax").await;

    assert!(matches!(result, Err(StoreError::GroupInUse { count: 1, .. })));
    assert_eq!(clear.hits_async().await, 0);
    Ok(())
}

#[tokio::test]
async fn rename_group_skips_duplicate_and_emailless_rows() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    mock_group_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Groups!A2:A", SHEET));
            then.status(200).json_body(json!({ "values": [["Tax"]] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A2:F", SHEET));
            then.status(200).json_body(json!({
                "values": [
                    ["Ann", "A", "ann@nowak.pl", "", "PL", "Tax"],
                    ["Ann again", "A", "ANN@nowak.pl ", "", "PL", "Tax"],
                    ["Draft", "C", "", "", "PL", "Tax"]
                ]
            }));
        })
        .await;
    let batch = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v4/spreadsheets/sheet-1/values:batchUpdate")
                .json_body(json!({
                    "valueInputOption": "RAW",
                    "data": [
                        { "range": "Groups!A2", "values": [["Taxation"]] },
                        { "range": "Sheet1!F2", "values": [["Taxation"]] }
                    ]
                }));
            then.status(200).json_body(json!({}));
        })
        .await;

    let touched = static_store(&server)?.rename_group("Tax", "Taxation").await?;

    assert_eq!(touched, 1);
    batch.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn delete_group_counts_each_member_once() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    mock_group_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Groups!A2:A", SHEET));
            then.status(200).json_body(json!({ "values": [["Tax"]] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A2:F", SHEET));
            then.status(200).json_body(json!({
                "values": [
                    ["Ann", "A", "ann@nowak.pl", "", "PL", "Tax"],
                    ["Ann again", "A", "ann@nowak.pl", "", "PL", "Tax"],
                    ["Draft", "C", "", "", "PL", "Tax"]
                ]
            }));
        })
        .await;

    let result = static_store(&server)?.delete_group("Tax").await;

    assert!(matches!(result, Err(StoreError::GroupInUse { count: 1, .. })));
    Ok(())
}

#[tokio::test]
async fn delete_group_ignores_references_from_emailless_rows() -> Result<()> {
    let server = MockServer::start_async().await;
    mock_member_header(&server).await;
    mock_group_header(&server).await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Groups!A2:A", SHEET));
            then.status(200).json_body(json!({ "values": [["Tax"]] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A2:F", SHEET));
            then.status(200).json_body(json!({
                "values": [["Draft", "C", "", "", "PL", "Tax"]]
            }));
        })
        .await;
    let clear = server
        .mock_async(|when, then| {
            when.method(POST).path(format!("{}/Groups!A2:clear", SHEET));
            then.status(200).json_body(json!({}));
        })
        .await;

    static_store(&server)?.delete_group("Tax").await?;

    clear.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn api_failure_surfaces_as_store_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("{}/Sheet1!A1:F1", SHEET));
            then.status(403).body("forbidden");
        })
        .await;

    let result = static_store(&server)?.health_check().await;

    assert!(matches!(result, Err(StoreError::Sheets(msg)) if msg.contains("403")));
    Ok(())
}

#[tokio::test]
async fn service_account_token_is_exchanged_once_and_cached() -> Result<()> {
    let server = MockServer::start_async().await;
    let token = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/token")
                .header("content-type", "application/x-www-form-urlencoded")
                .body_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer");
            then.status(200).json_body(json!({
                "access_token": "sa-token",
                "token_type": "Bearer",
                "expires_in": 3600
            }));
        })
        .await;
    let header = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(format!("{}/Sheet1!A1:F1", SHEET))
                .header("authorization", "Bearer sa-token");
            then.status(200).json_body(json!({ "values": [["NAME"]] }));
        })
        .await;

    let key: ServiceAccountKey = serde_json::from_value(json!({
        "client_email": "directory@project.iam.gserviceaccount.com",
        "private_key": include_str!("fixtures/service_account_key.pem"),
        "token_uri": server.url("/token"),
    }))?;
    let store = store(&server, TokenSource::service_account(key))?;

    store.health_check().await?;
    store.health_check().await?;

    assert_eq!(token.hits_async().await, 1);
    assert_eq!(header.hits_async().await, 2);
    Ok(())
}
