pub mod dto;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::TrelloConfig;
use crate::error::{AppError, AppResult};
use crate::models::{Board, Card, List};

/// Due timestamps as the board API expects them.
pub fn format_due(due: &DateTime<Utc>) -> String {
    due.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub list_id: String,
    pub title: String,
    pub description: String,
    pub due: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BoardClient: Send + Sync {
    async fn list_boards(&self) -> AppResult<Vec<Board>>;
    async fn list_lists(&self, board_id: &str) -> AppResult<Vec<List>>;
    async fn list_cards_in_list(&self, list_id: &str) -> AppResult<Vec<Card>>;
    async fn list_all_cards_on_board(&self, board_id: &str) -> AppResult<Vec<Card>>;
    async fn create_card(&self, card: &NewCard) -> AppResult<Card>;
    async fn update_card_due(
        &self,
        card_id: &str,
        due: Option<DateTime<Utc>>,
        complete: bool,
    ) -> AppResult<()>;
    async fn update_card_description(&self, card_id: &str, description: &str) -> AppResult<()>;
    async fn update_card_title(&self, card_id: &str, title: &str) -> AppResult<()>;
    async fn move_card_to_top(&self, card_id: &str) -> AppResult<()>;
    async fn delete_card(&self, card_id: &str) -> AppResult<()>;
    async fn add_comment(&self, card_id: &str, text: &str) -> AppResult<()>;
    async fn add_label(&self, card_id: &str, color: &str) -> AppResult<()>;
}

pub struct TrelloHttpClient {
    client: Client,
    config: TrelloConfig,
}

impl TrelloHttpClient {
    pub fn new(config: TrelloConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> AppResult<Url> {
        let auth = [("key", self.config.api_key.as_str()), ("token", self.config.api_token.as_str())];
        Url::parse_with_params(
            &format!("{}{}", self.config.base_url, path),
            auth.iter().chain(params.iter()),
        )
        .map_err(|e| AppError::Config(format!("invalid Trello URL {}: {}", path, e)))
    }

    async fn request(&self, method: Method, path: &str, params: &[(&str, &str)]) -> AppResult<String> {
        let url = self.url(path, params)?;
        debug!("Trello {} {}", method, path);
        let response = self.client.request(method, url).send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Api {
                service: "Trello",
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> AppResult<T> {
        let body = self.request(Method::GET, path, params).await?;
        serde_json::from_str(&body)
            .map_err(|e| AppError::Decode(format!("Trello {}: {}", path, e)))
    }

    async fn update_card(&self, card_id: &str, params: &[(&str, &str)]) -> AppResult<()> {
        self.request(Method::PUT, &format!("/cards/{}", card_id), params)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl BoardClient for TrelloHttpClient {
    async fn list_boards(&self) -> AppResult<Vec<Board>> {
        self.get_json("/members/me/boards", &[]).await
    }

    async fn list_lists(&self, board_id: &str) -> AppResult<Vec<List>> {
        self.get_json(&format!("/boards/{}/lists", board_id), &[]).await
    }

    async fn list_cards_in_list(&self, list_id: &str) -> AppResult<Vec<Card>> {
        self.get_json(&format!("/lists/{}/cards", list_id), &[]).await
    }

    async fn list_all_cards_on_board(&self, board_id: &str) -> AppResult<Vec<Card>> {
        self.get_json(&format!("/boards/{}/cards", board_id), &[]).await
    }

    async fn create_card(&self, card: &NewCard) -> AppResult<Card> {
        let due = card.due.as_ref().map(format_due);
        let mut params = vec![("idList", card.list_id.as_str()), ("name", card.title.as_str())];
        if !card.description.is_empty() {
            params.push(("desc", card.description.as_str()));
        }
        if let Some(due) = due.as_deref() {
            params.push(("due", due));
        }

        let body = self.request(Method::POST, "/cards", &params).await?;
        serde_json::from_str(&body)
            .map_err(|e| AppError::Decode(format!("Trello created card: {}", e)))
    }

    async fn update_card_due(
        &self,
        card_id: &str,
        due: Option<DateTime<Utc>>,
        complete: bool,
    ) -> AppResult<()> {
        let due = due.as_ref().map(format_due).unwrap_or_else(|| "null".to_string());
        let complete = complete.to_string();
        self.update_card(card_id, &[("due", due.as_str()), ("dueComplete", complete.as_str())])
            .await
    }

    async fn update_card_description(&self, card_id: &str, description: &str) -> AppResult<()> {
        self.update_card(card_id, &[("desc", description)]).await
    }

    async fn update_card_title(&self, card_id: &str, title: &str) -> AppResult<()> {
        self.update_card(card_id, &[("name", title)]).await
    }

    async fn move_card_to_top(&self, card_id: &str) -> AppResult<()> {
        self.update_card(card_id, &[("pos", "top")]).await
    }

    async fn delete_card(&self, card_id: &str) -> AppResult<()> {
        self.request(Method::DELETE, &format!("/cards/{}", card_id), &[])
            .await
            .map(|_| ())
    }

    async fn add_comment(&self, card_id: &str, text: &str) -> AppResult<()> {
        self.request(
            Method::POST,
            &format!("/cards/{}/actions/comments", card_id),
            &[("text", text)],
        )
        .await
        .map(|_| ())
    }

    async fn add_label(&self, card_id: &str, color: &str) -> AppResult<()> {
        let card: dto::CardBoardRef = self
            .get_json(&format!("/cards/{}", card_id), &[("fields", "idBoard")])
            .await?;
        let labels: Vec<dto::Label> = self
            .get_json(&format!("/boards/{}/labels", card.board_id), &[])
            .await?;

        let label = labels
            .iter()
            .find(|l| l.color.as_deref() == Some(color))
            .ok_or_else(|| AppError::not_found(format!("{} label on board", color)))?;
        debug!("Using label '{}' ({})", label.name, label.id);

        self.request(
            Method::POST,
            &format!("/cards/{}/idLabels", card_id),
            &[("value", label.id.as_str())],
        )
        .await
        .map(|_| ())
    }
}
