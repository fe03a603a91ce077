use serde::{Deserialize, Serialize};

/// Opaque element reference minted by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementHandle(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitUntil {
    Load,
    DomContentLoaded,
    NetworkIdle0,
    NetworkIdle2,
}

/// One job card as scraped; every field may be missing on a broken card.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawListing {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub posted: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A form control as the driver sees it: `input_type` is the tag name for
/// `select`/`textarea`, otherwise the `type` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFormField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input_type: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverDiag {
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub browser: Option<String>,
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}
