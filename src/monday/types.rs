/// Monday.com GraphQL response shapes

use serde::{Deserialize, Serialize};

/// Title of the board column a value belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnValue {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub column: Option<ColumnRef>,
}

impl ColumnValue {
    /// Column title, falling back to the column id
    pub fn title(&self) -> &str {
        self.column
            .as_ref()
            .map(|c| c.title.as_str())
            .unwrap_or(self.id.as_str())
    }
}

/// A board item with its column values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub column_values: Vec<ColumnValue>,
}

/// Id and name as listed on a board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ItemsData {
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawItemSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ItemsPage {
    #[serde(default)]
    pub items: Vec<RawItemSummary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Board {
    #[serde(default)]
    pub items_page: Option<ItemsPage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BoardsData {
    #[serde(default)]
    pub boards: Vec<Board>,
}
