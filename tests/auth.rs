/*
 * Copyright (c) 2025 Craig Hamilton and Contributors.
 * Licensed under either of
 *  - Apache License, Version 2.0 <http://www.apache.org/licenses/LICENSE-2.0> OR
 *  - MIT license <http://opensource.org/licenses/MIT>
 *  at your option.
 */
mod helpers;

#[cfg(test)]
mod test {
    use crate::helpers::{json_reply, mock_client, status_reply, test_creds, text_reply, token_reply};
    use dailymotion::api::{Creds, Operation, RequestError, RequestEvent, Scope, Status};
    use serde_json::json;

    #[test]
    fn authorization_url_carries_the_client_and_scopes() {
        let (client, _transport) = mock_client(test_creds());
        let auth = client.authentication();
        auth.set_redirect_uri("https://app.example/callback");
        auth.set_scopes(&[Scope::Email, Scope::ManageVideos]);

        let url = auth.authorization_url();
        assert_eq!(url.path(), "/oauth/authorize");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("response_type".to_string(), "code".to_string()),
                ("client_id".to_string(), "client-id".to_string()),
                ("redirect_uri".to_string(), "https://app.example/callback".to_string()),
                ("scope".to_string(), "email manage_videos".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn code_exchange_installs_the_tokens() {
        let (client, transport) = mock_client(Creds::from_tokens(
            "client-id",
            Some("client-secret"),
            None,
            None,
        ));
        transport.push(token_reply("fresh-token", Some("fresh-refresh")));

        let auth = client.authentication();
        let mut events = auth.subscribe();
        auth.set_redirect_uri("https://app.example/callback");
        let status = auth.exchange_code_for_access_token("the-code").await.unwrap();

        assert_eq!(status, Status::Ready);
        assert_eq!(auth.access_token(), "fresh-token");
        assert_eq!(auth.refresh_token(), "fresh-refresh");
        let token = auth.token().unwrap();
        assert_eq!(token.access_token, "fresh-token");
        assert_eq!(token.uid.as_deref(), Some("x1user"));
        assert_eq!(token.expires_in, Some(36000));

        let sent = transport.sent();
        assert_eq!(sent[0].operation, Operation::Post);
        assert_eq!(sent[0].url.as_str(), "https://api.dailymotion.com/oauth/token");
        assert_eq!(sent[0].header("Authorization"), None);
        let body = sent[0].body.clone().unwrap();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=the-code"));
        assert!(body.contains("redirect_uri=https%3A%2F%2Fapp.example%2Fcallback"));

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert!(received.contains(&RequestEvent::AccessTokenChanged));
        assert!(received.contains(&RequestEvent::RefreshTokenChanged));
    }

    #[tokio::test]
    async fn password_exchange_sends_the_scopes() {
        let (client, transport) = mock_client(test_creds());
        transport.push(token_reply("fresh-token", None));

        let auth = client.authentication();
        auth.set_scopes(&[Scope::Userinfo, Scope::ManagePlaylists]);
        let status = auth
            .exchange_credentials_for_access_token("someone@example.com", "p&ss")
            .await
            .unwrap();

        assert_eq!(status, Status::Ready);
        let body = transport.sent()[0].body.clone().unwrap();
        assert!(body.contains("grant_type=password"));
        assert!(body.contains("username=someone%40example.com"));
        assert!(body.contains("password=p%26ss"));
        assert!(body.contains("scope=userinfo%20manage_playlists"));
        // Refresh token unchanged when none is returned
        assert_eq!(auth.refresh_token(), "refresh-token");
    }

    #[tokio::test]
    async fn rejected_exchange_is_not_refreshed() {
        let (client, transport) = mock_client(test_creds());
        transport.push(json_reply(
            401,
            json!({"error": "invalid_client", "error_description": "Bad client credentials"}),
        ));

        let auth = client.authentication();
        let status = auth.exchange_code_for_access_token("the-code").await.unwrap();
        assert_eq!(status, Status::Failed);
        assert_eq!(auth.error(), RequestError::AuthenticationRequired);
        assert_eq!(transport.sent_count(), 1);
        assert_eq!(auth.access_token(), "old-token");
    }

    #[tokio::test]
    async fn token_response_without_access_token_fails() {
        let (client, transport) = mock_client(test_creds());
        transport.push(json_reply(200, json!({"token_type": "Bearer"})));

        let auth = client.authentication();
        let status = auth.exchange_code_for_access_token("the-code").await.unwrap();
        assert_eq!(status, Status::Failed);
        assert_eq!(auth.error(), RequestError::UnknownContentError);
        assert!(auth.token().is_err());
    }

    #[tokio::test]
    async fn revoke_accepts_an_empty_reply() {
        let (client, transport) = mock_client(test_creds());
        transport.push(text_reply(200, ""));

        let auth = client.authentication();
        assert_eq!(auth.revoke_access_token().await.unwrap(), Status::Ready);
        let sent = transport.sent();
        assert_eq!(sent[0].operation, Operation::Get);
        assert_eq!(sent[0].url.as_str(), "https://api.dailymotion.com/logout");
        assert_eq!(sent[0].header("Authorization"), Some("Bearer old-token"));
    }

    #[tokio::test]
    async fn revoke_refreshes_an_expired_token() {
        let (client, transport) = mock_client(test_creds());
        transport.push(status_reply(401));
        transport.push(token_reply("new-token", None));
        transport.push(status_reply(200));

        let auth = client.authentication();
        assert_eq!(auth.revoke_access_token().await.unwrap(), Status::Ready);
        assert_eq!(transport.sent()[2].header("Authorization"), Some("Bearer new-token"));
    }
}
