mod helpers;

use helpers::{api_path, bearer, create_company, invite, setup_test_app, sign_up};
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_invitation_returns_link() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = sign_up(client, "owner@example.com").await;
    let company_id = create_company(client, &owner, "Acme Rotas").await;

    let invitation = invite(client, &owner, &company_id, "Bob@Example.com").await;
    let token = invitation["invitation_token"].as_str().unwrap();
    assert_eq!(token.len(), 64);
    assert_eq!(invitation["status"], "pending");
    assert_eq!(invitation["role"], "member");
    assert_eq!(invitation["message"], "Welcome aboard");
    assert_eq!(
        invitation["invitation_url"],
        format!("https://app.rota.test/join?token={}", token)
    );

    let listed: Value = client
        .get(&api_path(&format!("/companies/{}/invitations", company_id)))
        .add_header("Authorization", bearer(&owner.token))
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_invitation_validation() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = sign_up(client, "owner@example.com").await;
    let company_id = create_company(client, &owner, "Acme Rotas").await;
    let path = api_path(&format!("/companies/{}/invitations", company_id));

    let response = client
        .post(&path)
        .add_header("Authorization", bearer(&owner.token))
        .json(&json!({ "email": "not-an-email" }))
        .await;
    response.assert_status_bad_request();

    let response = client
        .post(&path)
        .add_header("Authorization", bearer(&owner.token))
        .json(&json!({ "email": "bob@example.com", "expires_in_days": 31 }))
        .await;
    response.assert_status_bad_request();

    let response = client
        .post(&path)
        .add_header("Authorization", bearer(&owner.token))
        .json(&json!({ "email": "bob@example.com", "role": "owner" }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_members_cannot_manage_invitations() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = sign_up(client, "owner@example.com").await;
    let outsider = sign_up(client, "eve@example.com").await;
    let company_id = create_company(client, &owner, "Acme Rotas").await;
    let invitation = invite(client, &owner, &company_id, "bob@example.com").await;
    let invitation_id = invitation["id"].as_str().unwrap();

    let response = client
        .post(&api_path(&format!("/companies/{}/invitations", company_id)))
        .add_header("Authorization", bearer(&outsider.token))
        .json(&json!({ "email": "mallory@example.com" }))
        .await;
    response.assert_status_forbidden();

    let response = client
        .delete(&api_path(&format!("/invitations/{}", invitation_id)))
        .add_header("Authorization", bearer(&outsider.token))
        .await;
    response.assert_status_forbidden();

    let response = client
        .get(&api_path(&format!("/companies/{}", company_id)))
        .add_header("Authorization", bearer(&outsider.token))
        .await;
    response.assert_status_forbidden();
}

#[tokio::test]
async fn test_outsiders_cannot_tell_which_companies_exist() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = sign_up(client, "owner@example.com").await;
    let outsider = sign_up(client, "eve@example.com").await;
    let real = create_company(client, &owner, "Acme Rotas").await;
    let unknown = uuid::Uuid::new_v4().to_string();

    for company_id in [&real, &unknown] {
        let response = client
            .get(&api_path(&format!("/companies/{}", company_id)))
            .add_header("Authorization", bearer(&outsider.token))
            .await;
        response.assert_status_forbidden();

        let response = client
            .post(&api_path(&format!("/companies/{}/invitations", company_id)))
            .add_header("Authorization", bearer(&outsider.token))
            .json(&json!({ "email": "mallory@example.com" }))
            .await;
        response.assert_status_forbidden();
    }
}

#[tokio::test]
async fn test_manage_invitation_lifecycle() {
    let app = setup_test_app().await;
    let client = app.client();
    let owner = sign_up(client, "owner@example.com").await;
    let company_id = create_company(client, &owner, "Acme Rotas").await;
    let invitation = invite(client, &owner, &company_id, "bob@example.com").await;
    let invitation_id = invitation["id"].as_str().unwrap();
    let token = invitation["invitation_token"].as_str().unwrap();

    let updated: Value = client
        .patch(&api_path(&format!("/invitations/{}/message", invitation_id)))
        .add_header("Authorization", bearer(&owner.token))
        .json(&json!({ "message": "  " }))
        .await
        .json();
    assert!(updated["message"].is_null());

    let response = client
        .post(&api_path(&format!("/invitations/{}/extend", invitation_id)))
        .add_header("Authorization", bearer(&owner.token))
        .json(&json!({ "days": 14 }))
        .await;
    response.assert_status_ok();
    let extended: Value = response.json();
    assert_eq!(extended["invitation_token"], token);
    assert!(
        extended["expires_at"].as_str().unwrap() > invitation["expires_at"].as_str().unwrap()
    );

    let bob = sign_up(client, "bob@example.com").await;
    let mine: Value = client
        .get(&api_path("/invitations/mine"))
        .add_header("Authorization", bearer(&bob.token))
        .await
        .json();
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let response = client
        .delete(&api_path(&format!("/invitations/{}", invitation_id)))
        .add_header("Authorization", bearer(&owner.token))
        .await;
    response.assert_status(axum::http::StatusCode::NO_CONTENT);

    let response = client
        .delete(&api_path(&format!("/invitations/{}", invitation_id)))
        .add_header("Authorization", bearer(&owner.token))
        .await;
    response.assert_status_not_found();

    let mine: Value = client
        .get(&api_path("/invitations/mine"))
        .add_header("Authorization", bearer(&bob.token))
        .await
        .json();
    assert!(mine.as_array().unwrap().is_empty());
}
