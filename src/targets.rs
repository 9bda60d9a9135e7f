use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// One monitored product page: where to look and what counts as "in stock".
///
/// `selector` and `attribute` locate the availability signal in the page;
/// `expected_value` is matched case-insensitively as a substring of the
/// attribute's value. Targets are immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub url: String,
    pub selector: String,
    pub attribute: String,
    pub expected_value: String,
    /// When set, a differing page title marks the poll as anomalous and
    /// suppresses any positive match (bot-challenge / redirect detection).
    pub expected_title: Option<String>,
}

impl Target {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        selector: impl Into<String>,
        attribute: impl Into<String>,
        expected_value: impl Into<String>,
        expected_title: Option<String>,
    ) -> Result<Self> {
        let target = Target {
            name: name.into(),
            url: url.into(),
            selector: selector.into(),
            attribute: attribute.into(),
            expected_value: expected_value.into(),
            expected_title,
        };
        target.validate()?;
        Ok(target)
    }

    fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(self.invalid("empty name"));
        }
        if self.url.is_empty() || Url::parse(&self.url).is_err() {
            return Err(self.invalid("invalid url"));
        }
        if self.attribute.is_empty() {
            return Err(self.invalid("empty attribute"));
        }
        if self.expected_value.is_empty() {
            return Err(self.invalid("empty expected value"));
        }
        if self.selector.is_empty() {
            return Err(self.invalid("empty selector"));
        }
        Selector::parse(&self.selector).map_err(|e| AppError::Selector {
            selector: self.selector.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    fn invalid(&self, message: &str) -> AppError {
        AppError::Target {
            name: self.name.clone(),
            message: message.to_string(),
        }
    }
}

/// The built-in registry of watched stores.
pub fn builtin_targets() -> Result<Vec<Target>> {
    Ok(vec![
        Target::new(
            "Amazon",
            "https://www.amazon.es/Playstation-Consola-PlayStation-5/dp/B08KKJ37F7/ref=sr_1_2",
            "input",
            "id",
            "add-to-cart-button",
            Some("Consola PlayStation 5: Amazon.es: Videojuegos".to_string()),
        )?,
        Target::new(
            "Game",
            "https://www.game.es/HARDWARE/CONSOLA/PLAYSTATION-5/CONSOLA-PLAYSTATION-5/183224",
            "button",
            "title",
            "comprar",
            None,
        )?,
        Target::new(
            "ECI",
            "https://www.elcorteingles.es/videojuegos/A37046604/",
            "button",
            "data-synth",
            "locator_add_cart_button",
            None,
        )?,
        Target::new(
            "MM",
            "https://www.mediamarkt.es/es/product/_consola-sony-ps5-825-gb-4k-hdr-blanco-1487016.html",
            "a[href]",
            "id",
            "pdp-add-to-cart",
            None,
        )?,
        Target::new(
            "PCComponentes",
            "https://www.pccomponentes.com/sony-playstation-5",
            "button",
            "class",
            "buy-button",
            None,
        )?,
    ])
}
