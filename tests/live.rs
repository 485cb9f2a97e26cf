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
    use crate::helpers;
    use dailymotion::api::{Client, Status};
    use dotenvy::dotenv;
    use futures::{StreamExt, pin_mut};
    use serde_json::json;

    // These talk to the real API and need DAILYMOTION_* values in a .env file
    #[ignore]
    #[tokio::test]
    async fn search_videos() {
        dotenv().ok();
        helpers::init_logging();
        let creds = helpers::get_auth_tokens().unwrap();
        let client = Client::new(creds).unwrap();

        let model = client.videos_model();
        let status = model
            .list("/videos", &helpers::filters(json!({"search": "rust", "limit": 5})), &[])
            .await
            .unwrap();
        assert_eq!(status, Status::Ready, "{}", model.error_string());
        assert!(model.count() <= 5);
        println!("Videos: {:?}", model.items());
    }

    #[ignore]
    #[tokio::test]
    async fn stream_all_locales() {
        dotenv().ok();
        let creds = helpers::get_auth_tokens().unwrap();
        let client = Client::new(creds).unwrap();

        let locales = client.locales();
        let filters = helpers::filters(json!({"limit": 100}));
        let items = locales.items(None, &filters, &[]);
        pin_mut!(items);
        let mut count = 0;
        while let Some(locale) = items.next().await {
            let locale = locale.unwrap();
            assert!(locale.contains_key("locale"));
            count += 1;
        }
        assert!(count > 0);
    }

    #[ignore]
    #[tokio::test]
    async fn authenticated_user_info() {
        dotenv().ok();
        let creds = helpers::get_auth_tokens().unwrap();
        let client = Client::new(creds).unwrap();

        let users = client.resources();
        let status = users
            .get("/me", &helpers::filters(json!({})), &["id", "screenname"])
            .await
            .unwrap();
        assert_eq!(status, Status::Ready, "{}", users.error_string());
        println!("User info: {:?}", users.result());
    }
}
