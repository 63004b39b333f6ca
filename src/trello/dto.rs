use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CardBoardRef {
    #[serde(rename = "idBoard")]
    pub board_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Label {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}
